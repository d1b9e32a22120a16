//! # Engine: the orchestration loop.
//!
//! The [`Engine`] owns the [`State`], the inbox every worker reports to, the
//! event [`Bus`] and the worker tracker. Its loop is the only code that
//! mutates state:
//!
//! ```text
//! EngineHandle::send(Input) ─┐
//! workers (MessageSink)     ─┴─► inbox ──► Reducer::reduce(&mut State, msg)
//!                                               │   (every queued message)
//!                              snapshot ◄───────┤
//!                                               ▼
//!                                          Vec<Effect>
//!                                               │
//!   StopDiscovery  ─► cancel the previous run's ingest workers
//!   StartDiscovery ─► DiscoveryFeed::start ─► ingest workers ─┐
//!   Probe          ─► probe worker (admission, N)            ─┤
//!   DispatchStep   ─► dispatch worker                        ─┤
//!   ConsumeStep    ─► output drain + result waiter           ─┼─► MessageSink ─► inbox
//!   LoadHosts      ─► ConfigStore::load                      ─┤
//!   SaveHosts      ─► ConfigStore::save                      ─┘
//!   Publish        ─► Bus ─► listener ─► SubscriberSet
//!   Quit           ─► shutdown
//! ```
//!
//! ## Shutdown
//! ```text
//! Quit (or OS signal when Config::handle_signals)
//!   └─► publish ShutdownRequested
//!   └─► runtime token cancelled, admission closed, tracker closed
//!   └─► wait up to Config::grace:
//!          ├─ all workers done → AllStoppedWithin, Ok(())
//!          └─ timeout          → GraceExceeded,    Err(RuntimeError::GraceExceeded)
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let engine = Engine::builder(Config::default(), backends)
//!     .with_subscribers(vec![Arc::new(LogWriter::new())])
//!     .build();
//! let handle = engine.handle();
//! let mut snapshots = engine.snapshots();
//!
//! tokio::spawn(async move {
//!     while snapshots.changed().await.is_ok() {
//!         render(&snapshots.borrow_and_update());
//!     }
//! });
//! handle.send(Input::RunAction(ActionKind::Refresh))?;
//! engine.run().await?;
//! ```

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::backends::Backends;
use crate::core::admission::AdmissionController;
use crate::core::builder::EngineBuilder;
use crate::core::handle::EngineHandle;
use crate::core::reducer::{Effect, Reducer};
use crate::core::state::State;
use crate::core::{Config, ingest, probe, shutdown, step};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind, Message, MessageSink};
use crate::model::Host;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Messages reduced between two snapshots at most.
const MAX_BATCH: usize = 1024;

/// Everything needed to turn effects into workers.
struct Dispatcher {
    backends: Backends,
    bus: Bus,
    admission: AdmissionController,
    sink: MessageSink,
    token: CancellationToken,
    tracker: TaskTracker,
    output_linger: Duration,
    /// Token of the discovery run whose ingest workers are live.
    discovery: Option<CancellationToken>,
}

impl Dispatcher {
    /// Carries out `effects` in order. Returns true if one of them was `Quit`.
    fn apply(&mut self, effects: Vec<Effect>) -> bool {
        let mut quit = false;
        for effect in effects {
            match effect {
                Effect::StartDiscovery { run, hosts } => {
                    debug!(run, hosts = hosts.len(), "starting discovery");
                    let streams = self.backends.discovery.start(&hosts);
                    let run_token = self.token.child_token();
                    ingest::spawn_ingest(&self.tracker, streams, run, &self.sink, &run_token);
                    if let Some(previous) = self.discovery.replace(run_token) {
                        previous.cancel();
                    }
                }
                Effect::StopDiscovery => {
                    if let Some(token) = self.discovery.take() {
                        debug!("cancelling previous discovery run");
                        token.cancel();
                    }
                }
                Effect::Probe { run, target } => {
                    self.tracker.spawn(probe::probe_target(
                        Arc::clone(&self.backends.prober),
                        self.admission.clone(),
                        target,
                        run,
                        self.sink.clone(),
                        self.token.clone(),
                    ));
                }
                Effect::DispatchStep { step, command } => {
                    debug!(?step, command = %command.label(), "dispatching step");
                    self.tracker.spawn(step::dispatch_step(
                        Arc::clone(&self.backends.executor),
                        step,
                        command,
                        self.sink.clone(),
                        self.token.clone(),
                    ));
                }
                Effect::ConsumeStep { step, channels } => {
                    step::consume_step(
                        &self.tracker,
                        step,
                        channels,
                        self.output_linger,
                        &self.sink,
                        &self.token,
                    );
                }
                Effect::LoadHosts => self.load_hosts(),
                Effect::SaveHosts(hosts) => self.save_hosts(hosts),
                Effect::Publish(ev) => self.bus.publish(ev),
                Effect::Quit => quit = true,
            }
        }
        quit
    }

    fn load_hosts(&self) {
        let store = Arc::clone(&self.backends.store);
        let sink = self.sink.clone();
        let token = self.token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                res = store.load() => {
                    sink.send(Message::HostsLoaded(res));
                }
                _ = token.cancelled() => {}
            }
        });
    }

    fn save_hosts(&self, hosts: Vec<Host>) {
        let store = Arc::clone(&self.backends.store);
        let sink = self.sink.clone();
        let token = self.token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                res = store.save(&hosts) => {
                    sink.send(Message::HostsSaved(res));
                }
                _ = token.cancelled() => {}
            }
        });
    }
}

/// Message-driven orchestration engine.
pub struct Engine {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    reducer: Reducer,
    dispatcher: Dispatcher,
    inbox: mpsc::UnboundedReceiver<Message>,
    snapshots: watch::Sender<Arc<State>>,
}

impl Engine {
    /// Returns a builder for an engine over `backends`.
    pub fn builder(cfg: Config, backends: Backends) -> EngineBuilder {
        EngineBuilder::new(cfg, backends)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        backends: Backends,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let (sink, inbox) = MessageSink::channel();
        let (snapshots, _) = watch::channel(Arc::new(State::default()));
        let reducer = Reducer::new(Arc::clone(&backends.planner));
        let dispatcher = Dispatcher {
            bus: Bus::new(cfg.bus_capacity_clamped()),
            admission: AdmissionController::new(cfg.probe_limit()),
            backends,
            sink,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            output_linger: cfg.output_linger,
            discovery: None,
        };
        Self {
            cfg,
            subscribers,
            reducer,
            dispatcher,
            inbox,
            snapshots,
        }
    }

    /// Handle for submitting inputs. Valid until the loop stops.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(self.dispatcher.sink.clone())
    }

    /// Receiver of state snapshots, updated after every batch of reductions.
    pub fn snapshots(&self) -> watch::Receiver<Arc<State>> {
        self.snapshots.subscribe()
    }

    /// Receiver of raw engine events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.dispatcher.bus.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs the loop until `Quit` (or a termination signal), then shuts down.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());

        let mut state = State::default();
        let quit_early = self.dispatcher.apply(self.reducer.init());
        if !quit_early {
            self.drive(&mut state).await;
        }

        let res = self.shutdown().await;
        listener_stop.cancel();
        if let Some(h) = listener {
            let _ = h.await;
        }
        res
    }

    /// Feeds inbox messages through the reducer until an effect asks to quit.
    async fn drive(&mut self, state: &mut State) {
        let handle_signals = self.cfg.handle_signals;
        let signal = async move {
            if !handle_signals {
                return future::pending::<()>().await;
            }
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => info!(signal, "termination signal received"),
                Err(e) => {
                    warn!(error = %e, "cannot listen for termination signals");
                    future::pending::<()>().await;
                }
            }
        };
        tokio::pin!(signal);

        loop {
            tokio::select! {
                msg = self.inbox.recv() => {
                    let Some(msg) = msg else { break };
                    let quit = self.reduce_batch(state, msg);
                    self.snapshots.send_replace(Arc::new(state.clone()));
                    if quit {
                        break;
                    }
                }
                _ = &mut signal => {
                    state.quitting = true;
                    self.snapshots.send_replace(Arc::new(state.clone()));
                    break;
                }
            }
        }
    }

    /// Reduces `first` and up to [`MAX_BATCH`] messages already queued behind it.
    ///
    /// Returns true as soon as an effect asks to quit; the rest stays queued.
    fn reduce_batch(&mut self, state: &mut State, first: Message) -> bool {
        let mut next = Some(first);
        let mut reduced = 0;
        while let Some(msg) = next.take() {
            let effects = self.reducer.reduce(state, msg);
            if self.dispatcher.apply(effects) {
                return true;
            }
            reduced += 1;
            if reduced < MAX_BATCH {
                next = self.inbox.try_recv().ok();
            }
        }
        false
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// After `stop` fires, events already queued on the bus are still
    /// delivered before the subscriber workers are drained.
    fn subscriber_listener(&self, stop: CancellationToken) -> Option<JoinHandle<()>> {
        if self.subscribers.is_empty() {
            return None;
        }
        let mut rx = self.dispatcher.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.dispatcher.bus.clone());

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(&ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        }))
    }

    /// Cancels every worker and waits for them within the grace period.
    async fn shutdown(&self) -> Result<(), RuntimeError> {
        let d = &self.dispatcher;
        d.bus.publish(Event::new(EventKind::ShutdownRequested));
        d.token.cancel();
        d.admission.close();
        d.tracker.close();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, d.tracker.wait()).await {
            Ok(()) => {
                d.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let stuck = d.tracker.len();
                warn!(?grace, stuck, "workers still running after grace period");
                d.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_count(stuck));
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::backends::{
        ComposePlanner, DiscoveryFeed, DiscoverySender, DiscoveryStreams, MemoryStore,
        StatusProber, StepChannels, StepExecutor,
    };
    use crate::error::StepError;
    use crate::model::{CommandStep, OverallStatus, RuntimeStatus, Target};

    /// Never finishes a run; keeps every sender alive.
    #[derive(Default)]
    struct StalledFeed {
        senders: Mutex<Vec<DiscoverySender>>,
    }

    impl DiscoveryFeed for StalledFeed {
        fn start(&self, _: &[Host]) -> DiscoveryStreams {
            let (sender, streams) = DiscoveryStreams::channel(1);
            self.senders.lock().unwrap().push(sender);
            streams
        }
    }

    struct Unused;

    #[async_trait]
    impl StatusProber for Unused {
        async fn status(&self, _: &Target) -> RuntimeStatus {
            RuntimeStatus::new(OverallStatus::Up)
        }
    }

    #[async_trait]
    impl StepExecutor for Unused {
        async fn execute(&self, _: &CommandStep) -> Result<StepChannels, StepError> {
            Err(StepError::spawn("unused"))
        }
    }

    fn dispatcher() -> Dispatcher {
        let backends = Backends {
            discovery: Arc::new(StalledFeed::default()),
            prober: Arc::new(Unused),
            executor: Arc::new(Unused),
            planner: Arc::new(ComposePlanner),
            store: Arc::new(MemoryStore::new(Vec::new())),
        };
        let (sink, _inbox) = MessageSink::channel();
        Dispatcher {
            backends,
            bus: Bus::new(16),
            admission: AdmissionController::new(4),
            sink,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            output_linger: Duration::ZERO,
            discovery: None,
        }
    }

    async fn settle_to(tracker: &TaskTracker, workers: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while tracker.len() != workers {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("workers did not settle");
    }

    #[tokio::test]
    async fn test_new_run_cancels_previous_ingest_workers() {
        let mut d = dispatcher();
        let quit = d.apply(vec![Effect::StartDiscovery {
            run: 1,
            hosts: Vec::new(),
        }]);
        assert!(!quit);
        assert_eq!(d.tracker.len(), 3);

        d.apply(vec![
            Effect::StopDiscovery,
            Effect::StartDiscovery {
                run: 2,
                hosts: Vec::new(),
            },
        ]);
        settle_to(&d.tracker, 3).await;
        assert!(!d.token.is_cancelled());

        d.apply(vec![Effect::StopDiscovery]);
        settle_to(&d.tracker, 0).await;
    }
}
