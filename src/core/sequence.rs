//! # Command sequences.
//!
//! A [`Sequence`] is the ordered list of steps built for one batched action,
//! plus a cursor. [`SequenceState`] is the state machine the reducer drives:
//!
//! ```text
//!            RunAction (non-empty build)
//!   Idle ─────────────────────────────────► Running(seq, 0)
//!                                              │  step i Ok, i+1 < len
//!                                              ├──────────────► Running(seq, i+1)
//!                                              │  step i Ok, i+1 == len
//!                                              ├──────────────► Completed(seq)
//!                                              │  step i Err
//!                                              └──────────────► Failed(seq, i, err)
//!   Completed / Failed ── acknowledge ──► Idle
//! ```
//!
//! ## Rules
//! - The cursor only moves forward.
//! - Exactly one step of the running sequence is in flight.
//! - A step is resolved only after both its terminal result **and** the end of
//!   its output stream have been seen, so its lines precede its boundary marker.

use std::collections::HashSet;

use crate::backends::StepPlanner;
use crate::error::StepError;
use crate::events::StepKey;
use crate::model::{ActionKind, CommandStep, Target};

/// Builds the steps of `action` over `targets`.
///
/// The result is the concatenation, in `targets` order, of each target's
/// planned steps. Targets without steps contribute nothing.
pub fn build_sequence(
    planner: &dyn StepPlanner,
    action: ActionKind,
    targets: &[Target],
) -> Vec<CommandStep> {
    targets
        .iter()
        .flat_map(|t| planner.steps_for(action, t))
        .collect()
}

/// Where a sequence was started from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceOrigin {
    /// Target listing (one or more discovered targets).
    Targets,
    /// Host listing (single host-level action on the named host).
    Host(String),
}

/// Ordered steps plus cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    /// Unique id, used to tag step messages.
    pub id: u64,
    /// Where the sequence was started from.
    pub origin: SequenceOrigin,
    steps: Vec<CommandStep>,
    cursor: usize,
}

impl Sequence {
    /// Creates a sequence positioned on its first step.
    ///
    /// `steps` must not be empty.
    pub fn new(id: u64, origin: SequenceOrigin, steps: Vec<CommandStep>) -> Self {
        debug_assert!(!steps.is_empty(), "sequence without steps");
        Self {
            id,
            origin,
            steps,
            cursor: 0,
        }
    }

    pub fn steps(&self) -> &[CommandStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The step under the cursor.
    pub fn current(&self) -> &CommandStep {
        &self.steps[self.cursor]
    }

    pub fn key(&self) -> StepKey {
        StepKey {
            sequence: self.id,
            index: self.cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.steps.len()
    }

    /// Moves to the next step. No-op on the last step.
    pub fn advance(&mut self) {
        if !self.is_last() {
            self.cursor += 1;
        }
    }

    /// Distinct targets referenced by the steps, in first-appearance order.
    pub fn distinct_targets(&self) -> Vec<Target> {
        let mut seen = HashSet::new();
        self.steps
            .iter()
            .filter_map(|s| s.scope.target())
            .filter(|t| seen.insert(t.id.clone()))
            .cloned()
            .collect()
    }
}

/// What has been observed of the step in flight.
///
/// Informational only: the step resolves on its terminal result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepProgress {
    /// The executor handed over a channel pair.
    pub channels_ready: bool,
    /// The output stream reached its end.
    pub output_closed: bool,
}

/// A running sequence and the progress of its current step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSequence {
    pub sequence: Sequence,
    pub progress: StepProgress,
}

impl ActiveSequence {
    pub fn new(sequence: Sequence) -> Self {
        Self {
            sequence,
            progress: StepProgress::default(),
        }
    }

    pub fn key(&self) -> StepKey {
        self.sequence.key()
    }
}

/// Sequence execution state machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SequenceState {
    /// Nothing running.
    #[default]
    Idle,
    /// One step in flight.
    Running(ActiveSequence),
    /// Every step succeeded; waiting for acknowledgement.
    Completed(Sequence),
    /// Step `index` failed; later steps never ran. Waiting for acknowledgement.
    Failed {
        sequence: Sequence,
        index: usize,
        error: StepError,
    },
}

impl SequenceState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SequenceState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SequenceState::Running(_))
    }

    /// Completed or failed.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            SequenceState::Completed(_) | SequenceState::Failed { .. }
        )
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        match self {
            SequenceState::Idle => None,
            SequenceState::Running(active) => Some(&active.sequence),
            SequenceState::Completed(seq) => Some(seq),
            SequenceState::Failed { sequence, .. } => Some(sequence),
        }
    }

    /// Key of the step in flight, if any.
    pub fn running_key(&self) -> Option<StepKey> {
        match self {
            SequenceState::Running(active) => Some(active.key()),
            _ => None,
        }
    }
}
