//! # Reducer inputs.
//!
//! [`Message`] is the complete catalog of things that can happen to the engine:
//! user [`Input`]s and worker reports. The reducer matches it exhaustively.
//!
//! ## Staleness tags
//! - Discovery and status messages carry the discovery `run` they belong to.
//!   Messages from an older run are dropped.
//! - Step messages carry a [`StepKey`] (sequence id + step index). Messages for
//!   anything but the step currently executing are dropped.

use crate::backends::StepChannels;
use crate::error::{ConfigError, DiscoveryError, StepError};
use crate::model::{ActionKind, Host, RuntimeStatus, Target, TargetId};

/// Identifies one step of one sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepKey {
    /// Sequence id, unique for the engine's lifetime.
    pub sequence: u64,
    /// 0-based index of the step within the sequence.
    pub index: usize,
}

/// Which discovery stream closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryStream {
    Targets,
    Errors,
}

/// Cursor movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Discrete user intents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Move the cursor of the current listing.
    Navigate(Direction),
    /// Toggle the cursor target in or out of the selection.
    ToggleSelect,
    /// Run an action over the selection (target view) or the cursor host (host view).
    RunAction(ActionKind),
    /// Acknowledge a finished sequence.
    Confirm,
    /// Acknowledge a finished sequence, leave the host view, or clear the selection.
    Cancel,
    /// Rediscover every target.
    Refresh,
    /// Re-probe every listed target.
    RefreshStatus,
    /// Switch to the host listing and reload the host configuration.
    ShowHosts,
    /// Persist an edited host list.
    SaveHosts(Vec<Host>),
    /// Stop the engine.
    Quit,
}

/// Everything the reducer reacts to.
#[derive(Debug)]
pub enum Message {
    /// A user intent.
    Input(Input),

    /// The discovery feed reported a target.
    TargetDiscovered { run: u64, target: Target },
    /// The discovery feed reported a non-fatal error.
    DiscoveryError { run: u64, error: DiscoveryError },
    /// One of the discovery streams closed.
    DiscoveryStreamClosed { run: u64, stream: DiscoveryStream },
    /// The discovery feed signalled completion.
    DiscoveryDone { run: u64 },

    /// A status probe finished (successfully or not).
    StatusLoaded {
        run: u64,
        id: TargetId,
        status: RuntimeStatus,
    },

    /// The executor started a step and handed over its channel pair.
    StepChannelsReady { step: StepKey, channels: StepChannels },
    /// One output line of the executing step.
    StepOutput { step: StepKey, line: String },
    /// The output stream of the executing step closed.
    StepOutputClosed { step: StepKey },
    /// The executing step reported its terminal result.
    StepFinished {
        step: StepKey,
        result: Result<(), StepError>,
    },

    /// The configuration store returned the host list.
    HostsLoaded(Result<Vec<Host>, ConfigError>),
    /// The configuration store finished saving.
    HostsSaved(Result<(), ConfigError>),
}

impl From<Input> for Message {
    fn from(input: Input) -> Self {
        Message::Input(input)
    }
}
