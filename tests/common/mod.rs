//! Fake collaborators for engine tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use stackvisor::{
    ActionKind, Backends, CommandStep, ComposePlanner, ConfigStore, DiscoveryError, DiscoveryFeed,
    DiscoveryStreams, Host, MemoryStore, OverallStatus, RuntimeStatus, State, StatusProber,
    StepChannels, StepError, StepExecutor, StepPlanner, Target,
};

pub fn target(name: &str) -> Target {
    Target::new("srv1", &format!("/opt/{name}"), name)
}

pub fn host() -> Host {
    Host::new("srv1", "10.0.0.5")
}

/// Reports a fixed list of targets and errors for every non-empty host list.
#[derive(Default)]
pub struct FakeFeed {
    pub targets: Vec<Target>,
    pub errors: Vec<DiscoveryError>,
}

impl DiscoveryFeed for FakeFeed {
    fn start(&self, hosts: &[Host]) -> DiscoveryStreams {
        let (sender, streams) = DiscoveryStreams::channel(4);
        let targets = if hosts.is_empty() {
            Vec::new()
        } else {
            self.targets.clone()
        };
        let errors = self.errors.clone();
        tokio::spawn(async move {
            for t in targets {
                if sender.targets.send(t).await.is_err() {
                    return;
                }
            }
            for e in errors {
                if sender.errors.send(e).await.is_err() {
                    return;
                }
            }
            sender.finish();
        });
        streams
    }
}

/// Returns configured statuses after a per-target delay, tracking concurrency.
#[derive(Default)]
pub struct FakeProber {
    pub statuses: HashMap<String, OverallStatus>,
    pub delays: HashMap<String, Duration>,
    pub default_delay: Duration,
    pub calls: Mutex<HashMap<String, usize>>,
    pub current: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeProber {
    pub fn with(mut self, name: &str, status: OverallStatus, delay: Duration) -> Self {
        self.statuses.insert(name.to_string(), status);
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StatusProber for FakeProber {
    async fn status(&self, target: &Target) -> RuntimeStatus {
        *self.calls.lock().unwrap().entry(target.name.clone()).or_default() += 1;
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&target.name).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        RuntimeStatus::new(
            self.statuses
                .get(&target.name)
                .copied()
                .unwrap_or(OverallStatus::Up),
        )
    }
}

/// Emits `"<step> out"` plus `extra_lines` numbered lines for each step and
/// fails the steps named in `fail`.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub fail: HashSet<String>,
    pub extra_lines: usize,
    pub log: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn failing(name: &str) -> Self {
        Self {
            fail: HashSet::from([name.to_string()]),
            ..Self::default()
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepExecutor for ScriptedExecutor {
    async fn execute(&self, step: &CommandStep) -> Result<StepChannels, StepError> {
        self.log.lock().unwrap().push(step.name.clone());
        let (reporter, channels) = StepChannels::pair(2);
        let name = step.name.clone();
        let fails = self.fail.contains(&name);
        let extra = self.extra_lines;
        tokio::spawn(async move {
            reporter.line(format!("{name} out")).await;
            for i in 0..extra {
                reporter.line(format!("{name} line {i}")).await;
            }
            if fails {
                reporter.finish(Err(StepError::failed("exit status 1")));
            } else {
                reporter.finish(Ok(()));
            }
        });
        Ok(channels)
    }
}

/// Two steps per target: `<name>1`, `<name>2`.
pub struct TwoStep;

impl StepPlanner for TwoStep {
    fn steps_for(&self, action: ActionKind, target: &Target) -> Vec<CommandStep> {
        vec![
            CommandStep::for_target(format!("{}1", target.name), target, action),
            CommandStep::for_target(format!("{}2", target.name), target, action),
        ]
    }

    fn host_steps(&self, action: ActionKind, host: &Host) -> Vec<CommandStep> {
        ComposePlanner.host_steps(action, host)
    }
}

pub fn backends(
    feed: FakeFeed,
    prober: Arc<FakeProber>,
    executor: Arc<ScriptedExecutor>,
    store: Arc<dyn ConfigStore>,
) -> Backends {
    Backends {
        discovery: Arc::new(feed),
        prober,
        executor,
        planner: Arc::new(TwoStep),
        store,
    }
}

pub fn store_with_host() -> Arc<dyn ConfigStore> {
    Arc::new(MemoryStore::new(vec![host()]))
}

/// Waits until a snapshot satisfies `pred`.
pub async fn wait_for(
    rx: &mut watch::Receiver<Arc<State>>,
    pred: impl Fn(&State) -> bool,
) -> Arc<State> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snap = rx.borrow_and_update().clone();
            if pred(&snap) {
                return snap;
            }
            rx.changed().await.expect("engine stopped");
        }
    })
    .await
    .expect("timed out waiting for state")
}

/// Discovery finished and no probe in flight.
pub fn settled(s: &State) -> bool {
    s.discovery.run > 0 && !s.discovery.active && s.loading.is_empty()
}
