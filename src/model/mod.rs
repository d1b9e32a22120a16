//! Domain types shared by the engine, the collaborators and the renderers.
//!
//! ## Contents
//! - [`Target`], [`TargetId`] one discovered compose project
//! - [`RuntimeStatus`], [`OverallStatus`], [`ServiceRow`] probe results
//! - [`CommandStep`], [`StepScope`], [`ActionKind`] units of execution
//! - [`Host`] one configured machine

mod host;
mod status;
mod step;
mod target;

pub use host::Host;
pub use status::{OverallStatus, RuntimeStatus, ServiceRow};
pub use step::{ActionKind, CommandStep, StepScope};
pub use target::{Target, TargetId};
