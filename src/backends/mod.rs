//! # Collaborator interfaces.
//!
//! The engine owns coordination only. Everything that touches a shell, an SSH
//! session or a file lives behind one of these traits and is called **from a
//! worker task**, never from the reducer.
//!
//! ```text
//! DiscoveryFeed ──► DiscoveryStreams { targets, errors, done }
//! StatusProber  ──► RuntimeStatus               (one call per probe)
//! StepExecutor  ──► StepChannels { output, result }
//! StepPlanner   ──► Vec<CommandStep>             (pure, called by the reducer)
//! ConfigStore   ──► Vec<Host> / save
//! ```
//!
//! [`Backends`] bundles one implementation of each for the engine builder.

use std::sync::Arc;

mod discovery;
mod executor;
mod planner;
mod prober;
mod store;

pub use discovery::{DiscoveryFeed, DiscoverySender, DiscoveryStreams};
pub use executor::{StepChannels, StepExecutor, StepReporter};
pub use planner::{ComposePlanner, StepPlanner};
pub use prober::StatusProber;
pub use store::{ConfigStore, JsonFileStore, MemoryStore};

/// The set of collaborators an [`Engine`](crate::Engine) drives.
#[derive(Clone)]
pub struct Backends {
    pub discovery: Arc<dyn DiscoveryFeed>,
    pub prober: Arc<dyn StatusProber>,
    pub executor: Arc<dyn StepExecutor>,
    pub planner: Arc<dyn StepPlanner>,
    pub store: Arc<dyn ConfigStore>,
}
