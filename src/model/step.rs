//! # Command steps and action kinds.
//!
//! A [`CommandStep`] is the atomic unit the engine hands to a
//! [`StepExecutor`](crate::StepExecutor). Steps are produced by a
//! [`StepPlanner`](crate::StepPlanner) and never mutated afterwards.

use std::fmt;

use super::Target;

/// User-level action that expands into one or more steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Bring the project up.
    Start,
    /// Take the project down.
    Stop,
    /// Pull images, then recreate.
    Refresh,
    /// Pull images only.
    Pull,
    /// Remove unused data on a host.
    Prune,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Refresh => "refresh",
            ActionKind::Pull => "pull",
            ActionKind::Prune => "prune",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepScope {
    /// A discovered compose project.
    Target(Target),
    /// A configured host, by name (host-level maintenance).
    Host(String),
}

impl StepScope {
    /// Returns the target when the step is project-scoped.
    pub fn target(&self) -> Option<&Target> {
        match self {
            StepScope::Target(t) => Some(t),
            StepScope::Host(_) => None,
        }
    }
}

impl fmt::Display for StepScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepScope::Target(t) => t.fmt(f),
            StepScope::Host(h) => write!(f, "host {h}"),
        }
    }
}

/// One named unit of execution bound to a single scope and action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandStep {
    /// Step name (e.g. `"pull"`, `"up"`).
    pub name: String,
    /// Target or host the step runs against.
    pub scope: StepScope,
    /// Action this step belongs to.
    pub action: ActionKind,
}

impl CommandStep {
    /// Creates a project-scoped step.
    pub fn for_target(name: impl Into<String>, target: &Target, action: ActionKind) -> Self {
        Self {
            name: name.into(),
            scope: StepScope::Target(target.clone()),
            action,
        }
    }

    /// Creates a host-scoped step.
    pub fn for_host(name: impl Into<String>, host: impl Into<String>, action: ActionKind) -> Self {
        Self {
            name: name.into(),
            scope: StepScope::Host(host.into()),
            action,
        }
    }

    /// Short label used in markers and logs: `"pull (web@srv1)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.scope)
    }
}
