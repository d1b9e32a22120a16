//! # Reducer: the single place state changes.
//!
//! [`Reducer::reduce`] takes the current [`State`] and one [`Message`], mutates
//! the state synchronously and returns the [`Effect`]s the engine must carry
//! out. It never blocks, never spawns and never touches a collaborator except
//! the (pure) step planner.
//!
//! ## Architecture
//! ```text
//! Message ──► Reducer::reduce(&mut State, msg)
//!               ├─► Input::*                → view / selection / sequence start
//!               ├─► TargetDiscovered        → append, request probe
//!               ├─► DiscoveryError          → accumulate
//!               ├─► DiscoveryStreamClosed   ┐
//!               ├─► DiscoveryDone           ┴► completion banner
//!               ├─► StatusLoaded            → clear loading flag, store status
//!               ├─► StepChannelsReady       → ConsumeStep
//!               ├─► StepOutput              → append line verbatim
//!               ├─► StepOutputClosed        → noted
//!               ├─► StepFinished            → resolve step → next / Completed / Failed
//!               └─► HostsLoaded / HostsSaved → host list, rediscovery
//!             ──► Vec<Effect>
//! ```
//!
//! ## Rules
//! - Probes are deduplicated: the loading flag is set here, before the probe
//!   effect leaves, and cleared here when its result is reduced.
//! - Messages tagged with an old discovery run or a step other than the one in
//!   flight are dropped.
//! - Exactly one step is dispatched at a time; the next one only after the
//!   previous step's result is in. Lines arriving after that are stale.
//! - A new discovery run first cancels the workers of the previous one.

use std::mem;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backends::{StepChannels, StepPlanner};
use crate::core::output::Marker;
use crate::core::sequence::{ActiveSequence, Sequence, SequenceOrigin, SequenceState, build_sequence};
use crate::core::state::{Banner, BannerKind, State, View};
use crate::error::{ConfigError, DiscoveryError, StepError};
use crate::events::{Direction, DiscoveryStream, Event, EventKind, Input, Message, StepKey};
use crate::model::{ActionKind, CommandStep, Host, RuntimeStatus, Target, TargetId};

/// Work the engine performs on behalf of the reducer.
#[derive(Debug)]
pub enum Effect {
    /// Cancel the ingest workers of the current discovery run.
    StopDiscovery,
    /// Start discovery run `run` over `hosts`.
    StartDiscovery { run: u64, hosts: Vec<Host> },
    /// Probe `target` under admission; report tagged with `run`.
    Probe { run: u64, target: Target },
    /// Hand `command` to the executor.
    DispatchStep { step: StepKey, command: CommandStep },
    /// Drain the output and await the result of a started step.
    ConsumeStep { step: StepKey, channels: StepChannels },
    /// Read the host list from the configuration store.
    LoadHosts,
    /// Write the host list to the configuration store.
    SaveHosts(Vec<Host>),
    /// Publish an observation on the bus.
    Publish(Event),
    /// Stop the engine.
    Quit,
}

/// Pure state transition function.
#[derive(Clone)]
pub struct Reducer {
    planner: Arc<dyn StepPlanner>,
}

impl Reducer {
    pub fn new(planner: Arc<dyn StepPlanner>) -> Self {
        Self { planner }
    }

    /// Effects to run once at startup.
    pub fn init(&self) -> Vec<Effect> {
        vec![Effect::LoadHosts]
    }

    /// Applies `msg` to `state`.
    pub fn reduce(&self, state: &mut State, msg: Message) -> Vec<Effect> {
        let mut fx = Vec::new();
        match msg {
            Message::Input(input) => self.on_input(state, input, &mut fx),

            Message::TargetDiscovered { run, target } => {
                if is_current(state, run, "target") {
                    on_target(state, target, &mut fx);
                }
            }
            Message::DiscoveryError { run, error } => {
                if is_current(state, run, "discovery error") {
                    on_discovery_error(state, error, &mut fx);
                }
            }
            Message::DiscoveryStreamClosed { run, stream } => {
                if is_current(state, run, "stream close") {
                    match stream {
                        DiscoveryStream::Targets => state.discovery.targets_closed = true,
                        DiscoveryStream::Errors => state.discovery.errors_closed = true,
                    }
                    try_complete_discovery(state, &mut fx);
                }
            }
            Message::DiscoveryDone { run } => {
                if is_current(state, run, "done") {
                    state.discovery.done = true;
                    try_complete_discovery(state, &mut fx);
                }
            }

            Message::StatusLoaded { run, id, status } => {
                if is_current(state, run, "status") {
                    on_status(state, id, status, &mut fx);
                }
            }

            Message::StepChannelsReady { step, channels } => {
                match &mut state.sequence {
                    SequenceState::Running(active) if active.key() == step => {
                        active.progress.channels_ready = true;
                        fx.push(Effect::ConsumeStep { step, channels });
                    }
                    // Dropping the channels tells the executor nobody listens.
                    _ => warn!(?step, "dropping channels of stale step"),
                }
            }
            Message::StepOutput { step, line } => {
                if state.sequence.running_key() == Some(step) {
                    state.output.push_line(line);
                } else {
                    debug!(?step, "dropping output of stale step");
                }
            }
            Message::StepOutputClosed { step } => {
                if let SequenceState::Running(active) = &mut state.sequence {
                    if active.key() == step {
                        active.progress.output_closed = true;
                    }
                }
            }
            Message::StepFinished { step, result } => {
                if state.sequence.running_key() == Some(step) {
                    finish_step(state, result, &mut fx);
                } else {
                    debug!(?step, "dropping result of stale step");
                }
            }

            Message::HostsLoaded(result) => on_hosts_loaded(state, result, &mut fx),
            Message::HostsSaved(result) => match result {
                Ok(()) => fx.push(Effect::LoadHosts),
                Err(e) => config_failed(state, "failed to save hosts", &e, &mut fx),
            },
        }
        fx
    }

    fn on_input(&self, state: &mut State, input: Input, fx: &mut Vec<Effect>) {
        match input {
            Input::Navigate(dir) => navigate(state, dir),
            Input::ToggleSelect => {
                if state.view == View::Targets && state.cursor < state.targets.len() {
                    let i = state.cursor;
                    if !state.selection.remove(&i) {
                        state.selection.insert(i);
                    }
                }
            }
            Input::RunAction(action) => self.run_action(state, action, fx),
            Input::Confirm => {
                if state.view == View::Output {
                    acknowledge(state);
                }
            }
            Input::Cancel => match state.view {
                View::Output => acknowledge(state),
                View::Hosts => state.view = View::Targets,
                View::Targets => state.selection.clear(),
            },
            Input::Refresh => {
                if state.hosts.is_some() {
                    rediscover(state, fx);
                } else {
                    debug!("refresh before hosts are loaded");
                }
            }
            Input::RefreshStatus => {
                let targets = state.targets.clone();
                for t in &targets {
                    request_probe(state, t, fx);
                }
            }
            Input::ShowHosts => {
                if state.sequence.is_idle() {
                    state.view = View::Hosts;
                    fx.push(Effect::LoadHosts);
                }
            }
            Input::SaveHosts(hosts) => fx.push(Effect::SaveHosts(hosts)),
            Input::Quit => {
                state.quitting = true;
                fx.push(Effect::Quit);
            }
        }
    }

    fn run_action(&self, state: &mut State, action: ActionKind, fx: &mut Vec<Effect>) {
        if !state.sequence.is_idle() {
            debug!(%action, "sequence already in progress");
            return;
        }

        let (origin, steps) = match state.view {
            View::Targets => {
                let targets = state.action_targets();
                let steps = build_sequence(self.planner.as_ref(), action, &targets);
                (SequenceOrigin::Targets, steps)
            }
            View::Hosts => {
                let Some(host) = state.cursor_host().cloned() else {
                    return;
                };
                let steps = self.planner.host_steps(action, &host);
                (SequenceOrigin::Host(host.name), steps)
            }
            View::Output => return,
        };

        if steps.is_empty() {
            state.banner = Some(Banner::new(
                BannerKind::Info,
                format!("nothing to {action}"),
            ));
            return;
        }

        let id = state.next_sequence;
        state.next_sequence += 1;
        state.output.clear();
        state.view = View::Output;
        fx.push(Effect::Publish(
            Event::new(EventKind::SequenceStarted)
                .with_reason(action.as_str())
                .with_count(steps.len()),
        ));
        begin_step(state, ActiveSequence::new(Sequence::new(id, origin, steps)), fx);
    }
}

fn is_current(state: &State, run: u64, what: &'static str) -> bool {
    let current = run == state.discovery.run;
    if !current {
        debug!(run, current = state.discovery.run, what, "dropping message of stale run");
    }
    current
}

fn navigate(state: &mut State, dir: Direction) {
    let (cursor, len) = match state.view {
        View::Targets => (&mut state.cursor, state.targets.len()),
        View::Hosts => (
            &mut state.host_cursor,
            state.hosts.as_ref().map_or(0, Vec::len),
        ),
        View::Output => return,
    };
    *cursor = match dir {
        Direction::Up => cursor.saturating_sub(1),
        Direction::Down => (*cursor + 1).min(len.saturating_sub(1)),
    };
}

/// Emits a probe unless one is in flight for the same id.
fn request_probe(state: &mut State, target: &Target, fx: &mut Vec<Effect>) {
    if !state.loading.insert(target.id.clone()) {
        debug!(id = %target.id, "probe already in flight");
        return;
    }
    fx.push(Effect::Probe {
        run: state.discovery.run,
        target: target.clone(),
    });
}

fn on_target(state: &mut State, target: Target, fx: &mut Vec<Effect>) {
    fx.push(Effect::Publish(
        Event::new(EventKind::TargetDiscovered).with_target(target.to_string()),
    ));
    if !state.statuses.contains_key(&target.id) {
        request_probe(state, &target, fx);
    }
    state.targets.push(target);
}

fn on_discovery_error(state: &mut State, error: DiscoveryError, fx: &mut Vec<Effect>) {
    warn!(error = %error, "discovery error");
    fx.push(Effect::Publish(
        Event::new(EventKind::DiscoveryErrored).with_reason(error.as_message()),
    ));
    state.discovery.errors.push(error);
}

fn try_complete_discovery(state: &mut State, fx: &mut Vec<Effect>) {
    let d = &state.discovery;
    if !d.active || !d.is_complete() {
        return;
    }
    state.discovery.active = false;

    let found = state.targets.len();
    let errors = &state.discovery.errors;
    let banner = match (found, errors.len()) {
        (0, 0) => Some(Banner::new(
            BannerKind::NoneFound,
            "no compose projects found",
        )),
        (0, n) => Some(Banner::new(
            BannerKind::ErrorsNoneFound,
            format!("no compose projects found; {n} error(s): {}", join_errors(errors)),
        )),
        (_, 0) => None,
        (_, n) => Some(Banner::new(
            BannerKind::DiscoveryWarning,
            format!("{n} discovery error(s): {}", join_errors(errors)),
        )),
    };

    let mut ev = Event::new(EventKind::DiscoveryFinished).with_count(found);
    match banner {
        Some(b) => {
            ev = ev.with_reason(b.text.clone());
            state.banner = Some(b);
        }
        None => {
            if state.banner.as_ref().is_some_and(Banner::is_blocking) {
                state.banner = None;
            }
        }
    }
    fx.push(Effect::Publish(ev));
}

fn join_errors(errors: &[DiscoveryError]) -> String {
    errors
        .iter()
        .map(DiscoveryError::as_message)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resets everything derived from discovery and starts a new run.
fn rediscover(state: &mut State, fx: &mut Vec<Effect>) {
    state.targets.clear();
    state.statuses.clear();
    state.loading.clear();
    state.selection.clear();
    state.cursor = 0;
    if state.banner.as_ref().is_some_and(Banner::is_discovery) {
        state.banner = None;
    }
    let run = state.discovery.restart();
    let hosts = state.hosts.clone().unwrap_or_default();

    fx.push(Effect::Publish(
        Event::new(EventKind::DiscoveryStarted).with_count(hosts.len()),
    ));
    fx.push(Effect::StopDiscovery);
    fx.push(Effect::StartDiscovery { run, hosts });
}

fn on_status(state: &mut State, id: TargetId, status: RuntimeStatus, fx: &mut Vec<Effect>) {
    state.loading.remove(&id);
    let reason = match &status.error {
        Some(err) => format!("{}: {err}", status.overall),
        None => status.overall.to_string(),
    };
    fx.push(Effect::Publish(
        Event::new(EventKind::StatusLoaded)
            .with_target(id.as_str())
            .with_reason(reason),
    ));
    state.statuses.insert(id, status);
}

fn begin_step(state: &mut State, active: ActiveSequence, fx: &mut Vec<Effect>) {
    let seq = &active.sequence;
    let step = seq.current();
    state.output.push_marker(Marker::StepStarting {
        index: seq.cursor(),
        total: seq.len(),
        label: step.label(),
    });
    fx.push(Effect::Publish(
        Event::new(EventKind::StepStarting)
            .with_target(step.scope.to_string())
            .with_step(step.name.as_str())
            .with_index(seq.cursor()),
    ));
    fx.push(Effect::DispatchStep {
        step: active.key(),
        command: step.clone(),
    });
    state.sequence = SequenceState::Running(active);
}

fn finish_step(state: &mut State, result: Result<(), StepError>, fx: &mut Vec<Effect>) {
    let SequenceState::Running(active) = mem::take(&mut state.sequence) else {
        return;
    };
    if !active.progress.output_closed {
        debug!(step = ?active.key(), "resolving step with output still open");
    }
    let seq = active.sequence;
    match result {
        Err(error) => step_failed(state, seq, error, fx),
        Ok(()) => step_succeeded(state, seq, fx),
    }
}

fn step_failed(state: &mut State, sequence: Sequence, error: StepError, fx: &mut Vec<Effect>) {
    let index = sequence.cursor();
    let step = sequence.current();
    warn!(step = %step.label(), index, error = %error, "step failed");

    state.output.push_marker(Marker::StepFailed {
        index,
        label: step.label(),
        error: error.to_string(),
    });
    fx.push(Effect::Publish(
        Event::new(EventKind::StepFailed)
            .with_target(step.scope.to_string())
            .with_step(step.name.as_str())
            .with_index(index)
            .with_reason(error.to_string()),
    ));
    fx.push(Effect::Publish(
        Event::new(EventKind::SequenceFailed)
            .with_index(index)
            .with_reason(error.to_string()),
    ));

    match sequence.origin.clone() {
        SequenceOrigin::Targets => {
            state.sequence = SequenceState::Failed {
                sequence,
                index,
                error,
            };
        }
        SequenceOrigin::Host(host) => {
            let text = format!("{} failed: {error}", step.label());
            resolve_host_action(state, host, Banner::new(BannerKind::Error, text), fx);
        }
    }
}

fn step_succeeded(state: &mut State, mut sequence: Sequence, fx: &mut Vec<Effect>) {
    let index = sequence.cursor();
    let step = sequence.current();
    state.output.push_marker(Marker::StepSucceeded {
        index,
        label: step.label(),
    });
    fx.push(Effect::Publish(
        Event::new(EventKind::StepSucceeded)
            .with_target(step.scope.to_string())
            .with_step(step.name.as_str())
            .with_index(index),
    ));

    if !sequence.is_last() {
        sequence.advance();
        begin_step(state, ActiveSequence::new(sequence), fx);
        return;
    }

    let total = sequence.len();
    state.output.push_marker(Marker::SequenceSucceeded { total });
    fx.push(Effect::Publish(
        Event::new(EventKind::SequenceCompleted).with_count(total),
    ));

    match sequence.origin.clone() {
        SequenceOrigin::Targets => {
            for target in sequence.distinct_targets() {
                request_probe(state, &target, fx);
            }
            state.sequence = SequenceState::Completed(sequence);
        }
        SequenceOrigin::Host(host) => {
            let text = format!("{} succeeded", sequence.current().label());
            resolve_host_action(state, host, Banner::new(BannerKind::Info, text), fx);
        }
    }
}

/// Host actions never wait for acknowledgement.
fn resolve_host_action(state: &mut State, host: String, banner: Banner, fx: &mut Vec<Effect>) {
    state.sequence = SequenceState::Idle;
    state.output.clear();
    state.view = View::Hosts;
    fx.push(Effect::Publish(
        Event::new(EventKind::HostActionResolved)
            .with_target(host)
            .with_reason(banner.text.clone()),
    ));
    state.banner = Some(banner);
    fx.push(Effect::LoadHosts);
}

fn acknowledge(state: &mut State) {
    if state.sequence.is_resolved() {
        state.sequence = SequenceState::Idle;
        state.output.clear();
        state.view = View::Targets;
    }
}

fn on_hosts_loaded(state: &mut State, result: Result<Vec<Host>, ConfigError>, fx: &mut Vec<Effect>) {
    match result {
        Ok(hosts) => {
            fx.push(Effect::Publish(
                Event::new(EventKind::HostsLoaded).with_count(hosts.len()),
            ));
            state.host_cursor = state.host_cursor.min(hosts.len().saturating_sub(1));
            if state.hosts.as_ref() != Some(&hosts) {
                state.hosts = Some(hosts);
                rediscover(state, fx);
            }
        }
        Err(e) => {
            config_failed(state, "failed to load hosts", &e, fx);
            if state.hosts.is_none() {
                state.hosts = Some(Vec::new());
                rediscover(state, fx);
            }
        }
    }
}

fn config_failed(state: &mut State, what: &str, error: &ConfigError, fx: &mut Vec<Effect>) {
    warn!(error = %error, label = error.as_label(), "{what}");
    let text = format!("{what}: {error}");
    fx.push(Effect::Publish(
        Event::new(EventKind::ConfigFailed).with_reason(text.as_str()),
    ));
    state.banner = Some(Banner::new(BannerKind::Error, text));
}
