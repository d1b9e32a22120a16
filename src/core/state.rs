//! # Engine state.
//!
//! [`State`] is everything the engine knows. It is owned by the engine loop
//! and mutated only by the [`Reducer`](crate::Reducer); renderers read cloned
//! snapshots of it.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::output::OutputBuffer;
use crate::core::sequence::SequenceState;
use crate::error::DiscoveryError;
use crate::model::{Host, RuntimeStatus, Target, TargetId};

/// Which listing has focus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    /// Discovered targets.
    #[default]
    Targets,
    /// Configured hosts.
    Hosts,
    /// Output of the current sequence.
    Output,
}

/// Category of a [`Banner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerKind {
    /// Discovery finished without targets or errors.
    NoneFound,
    /// Discovery finished without targets but with errors.
    ErrorsNoneFound,
    /// Discovery found targets but also reported errors.
    DiscoveryWarning,
    /// Informational notice (host action succeeded, nothing to run).
    Info,
    /// Something failed (configuration store, host action).
    Error,
}

/// One-line notice shown above the listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl Banner {
    pub fn new(kind: BannerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Blocking banners replace the target listing entirely.
    pub fn is_blocking(&self) -> bool {
        matches!(self.kind, BannerKind::NoneFound | BannerKind::ErrorsNoneFound)
    }

    /// Banners produced by discovery completion.
    pub fn is_discovery(&self) -> bool {
        matches!(
            self.kind,
            BannerKind::NoneFound | BannerKind::ErrorsNoneFound | BannerKind::DiscoveryWarning
        )
    }
}

/// Progress of the current discovery run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryProgress {
    /// Generation of the current run. Messages tagged otherwise are stale.
    pub run: u64,
    /// A run is in progress.
    pub active: bool,
    pub targets_closed: bool,
    pub errors_closed: bool,
    pub done: bool,
    /// Errors reported during the current run.
    pub errors: Vec<DiscoveryError>,
}

impl DiscoveryProgress {
    /// Done fired and both streams closed.
    pub fn is_complete(&self) -> bool {
        self.done && self.targets_closed && self.errors_closed
    }

    /// Starts generation `run + 1`.
    pub(crate) fn restart(&mut self) -> u64 {
        *self = DiscoveryProgress {
            run: self.run + 1,
            active: true,
            ..DiscoveryProgress::default()
        };
        self.run
    }
}

/// Complete engine state.
#[derive(Clone, Debug, Default)]
pub struct State {
    pub view: View,

    /// Discovered targets in arrival order. Duplicates are kept.
    pub targets: Vec<Target>,
    /// Last probe result per target.
    pub statuses: HashMap<TargetId, RuntimeStatus>,
    /// Targets with a probe in flight.
    pub loading: HashSet<TargetId>,
    pub discovery: DiscoveryProgress,

    /// Selected indices into `targets`; iteration order is discovery order.
    pub selection: BTreeSet<usize>,
    /// Cursor into `targets`.
    pub cursor: usize,

    /// Configured hosts; `None` until first loaded.
    pub hosts: Option<Vec<Host>>,
    /// Cursor into `hosts`.
    pub host_cursor: usize,

    pub sequence: SequenceState,
    pub output: OutputBuffer,
    pub banner: Option<Banner>,

    /// Quit was requested.
    pub quitting: bool,
    /// Id of the next sequence.
    pub(crate) next_sequence: u64,
}

impl State {
    pub fn cursor_target(&self) -> Option<&Target> {
        self.targets.get(self.cursor)
    }

    pub fn cursor_host(&self) -> Option<&Host> {
        self.hosts.as_ref()?.get(self.host_cursor)
    }

    pub fn status(&self, id: &TargetId) -> Option<&RuntimeStatus> {
        self.statuses.get(id)
    }

    pub fn is_loading(&self, id: &TargetId) -> bool {
        self.loading.contains(id)
    }

    /// Targets an action applies to: the selection in discovery order, or the
    /// cursor target when nothing is selected.
    pub fn action_targets(&self) -> Vec<Target> {
        if self.selection.is_empty() {
            return self.cursor_target().cloned().into_iter().collect();
        }
        self.selection
            .iter()
            .filter_map(|&i| self.targets.get(i))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(names: &[&str]) -> State {
        State {
            targets: names
                .iter()
                .map(|n| Target::new("srv1", &format!("/opt/{n}"), *n))
                .collect(),
            ..State::default()
        }
    }

    #[test]
    fn test_action_targets_follow_discovery_order() {
        let mut st = state_with(&["a", "b", "c"]);
        st.selection.insert(2);
        st.selection.insert(0);
        let names: Vec<String> = st.action_targets().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_action_targets_fall_back_to_cursor() {
        let mut st = state_with(&["a", "b"]);
        st.cursor = 1;
        let names: Vec<String> = st.action_targets().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["b"]);

        assert!(State::default().action_targets().is_empty());
    }

    #[test]
    fn test_restart_bumps_run_and_resets() {
        let mut d = DiscoveryProgress {
            run: 3,
            done: true,
            errors: vec![DiscoveryError::new("x")],
            ..DiscoveryProgress::default()
        };
        assert_eq!(d.restart(), 4);
        assert!(d.active);
        assert!(!d.done);
        assert!(d.errors.is_empty());
    }
}
