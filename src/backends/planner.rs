//! # Step planner.
//!
//! Maps an [`ActionKind`] to the ordered steps it takes for one target or one
//! host. Planners are pure and synchronous: the reducer calls them directly.

use crate::model::{ActionKind, CommandStep, Host, Target};

/// Per-action step lists.
pub trait StepPlanner: Send + Sync + 'static {
    /// Steps `action` takes for `target`, in execution order.
    fn steps_for(&self, action: ActionKind, target: &Target) -> Vec<CommandStep>;

    /// Steps `action` takes on `host` itself. Empty when not host-level.
    fn host_steps(&self, action: ActionKind, host: &Host) -> Vec<CommandStep>;
}

/// Default planner for compose projects.
///
/// | action    | target steps   | host steps |
/// |-----------|----------------|------------|
/// | `Start`   | `up`           | -          |
/// | `Stop`    | `down`         | -          |
/// | `Refresh` | `pull`, `up`   | -          |
/// | `Pull`    | `pull`         | -          |
/// | `Prune`   | -              | `prune`    |
#[derive(Clone, Copy, Debug, Default)]
pub struct ComposePlanner;

impl StepPlanner for ComposePlanner {
    fn steps_for(&self, action: ActionKind, target: &Target) -> Vec<CommandStep> {
        let names: &[&str] = match action {
            ActionKind::Start => &["up"],
            ActionKind::Stop => &["down"],
            ActionKind::Refresh => &["pull", "up"],
            ActionKind::Pull => &["pull"],
            ActionKind::Prune => &[],
        };
        names
            .iter()
            .map(|name| CommandStep::for_target(*name, target, action))
            .collect()
    }

    fn host_steps(&self, action: ActionKind, host: &Host) -> Vec<CommandStep> {
        match action {
            ActionKind::Prune => vec![CommandStep::for_host("prune", &host.name, action)],
            _ => Vec::new(),
        }
    }
}
