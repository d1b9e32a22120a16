//! Engine core: state, reducer, workers and the orchestration loop.
//!
//! - `state`: everything the engine knows;
//! - `reducer`: pure `(State, Message) -> Effects` transition;
//! - `sequence`, `output`: sequence state machine and its output buffer;
//! - `admission`: counting gate bounding concurrent status probes;
//! - `probe`, `ingest`, `step`: workers spawned for effects;
//! - `engine`: the loop owning the state, and shutdown.

mod admission;
mod builder;
mod config;
mod engine;
mod handle;
mod ingest;
mod output;
mod probe;
mod reducer;
mod sequence;
mod shutdown;
mod state;
mod step;

pub use admission::{AdmissionController, AdmissionToken};
pub use builder::EngineBuilder;
pub use config::Config;
pub use engine::Engine;
pub use handle::EngineHandle;
pub use output::{Marker, OutputBuffer, OutputEntry};
pub use reducer::{Effect, Reducer};
pub use sequence::{
    ActiveSequence, Sequence, SequenceOrigin, SequenceState, StepProgress, build_sequence,
};
pub use state::{Banner, BannerKind, DiscoveryProgress, State, View};
