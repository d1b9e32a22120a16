//! # stackvisor
//!
//! **Stackvisor** is a message-driven orchestration engine for compose
//! projects ("stacks") spread across the local machine and SSH hosts.
//!
//! It discovers targets, probes their runtime status under a bounded
//! admission gate, and runs ordered multi-step command sequences that abort on
//! the first failure. All state lives in one place and changes only through a
//! pure reducer; slow work happens in workers that report back as messages.
//!
//! ## Architecture
//! ```text
//!   front-end ── EngineHandle::send(Input) ──┐
//!                                            ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Engine (single loop)                                             │
//! │   inbox ──► Reducer::reduce(&mut State, Message) ──► Vec<Effect> │
//! │   State ──► watch snapshots ──► renderers                        │
//! └────┬───────────────┬──────────────────┬────────────────┬─────────┘
//!      ▼               ▼                  ▼                ▼
//!  ingest workers  probe workers      step workers     store workers
//!  (DiscoveryFeed) (StatusProber,     (StepExecutor)   (ConfigStore)
//!                   admission ≤ N)
//!      │               │                  │                │
//!      └───────────────┴──── MessageSink ─┴────────────────┘
//!                                 │
//!                                 ▼
//!                               inbox
//!
//!   Effect::Publish ──► Bus ──► SubscriberSet ──► LogWriter, user subscribers
//! ```
//!
//! ## Features
//! | Area            | Description                                               | Key types                                  |
//! |-----------------|-----------------------------------------------------------|--------------------------------------------|
//! | **Engine**      | Loop, handle, snapshots, graceful shutdown                | [`Engine`], [`EngineHandle`], [`State`]    |
//! | **Reducer**     | Pure state transitions and effects                        | [`Reducer`], [`Message`], [`Effect`]       |
//! | **Sequences**   | Ordered steps, abort on failure, output with markers      | [`SequenceState`], [`OutputBuffer`]        |
//! | **Admission**   | Bounded concurrent status probes                          | [`AdmissionController`]                    |
//! | **Backends**    | Discovery, probing, execution, planning, host storage     | [`DiscoveryFeed`], [`StepExecutor`], ...   |
//! | **Events**      | Observations for logs and renderers                       | [`Event`], [`Subscribe`], [`LogWriter`]    |
//! | **Errors**      | Typed errors travelling as data                           | [`StepError`], [`RuntimeError`], ...       |
//!
//! ## Optional features
//! - `logging`: exports `telemetry::init` which installs a `tracing-subscriber`
//!   formatter filtered by `RUST_LOG`.
//!
//! ## Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use stackvisor::{
//!     ActionKind, Backends, ComposePlanner, Config, Engine, Input, JsonFileStore, LogWriter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backends = Backends {
//!         discovery: Arc::new(SshDiscovery::default()),
//!         prober: Arc::new(ComposePs::default()),
//!         executor: Arc::new(SshExecutor::default()),
//!         planner: Arc::new(ComposePlanner),
//!         store: Arc::new(JsonFileStore::new("hosts.json")),
//!     };
//!
//!     let engine = Engine::builder(Config::default(), backends)
//!         .with_subscribers(vec![Arc::new(LogWriter::new())])
//!         .build();
//!
//!     let handle = engine.handle();
//!     handle.send(Input::RunAction(ActionKind::Refresh))?;
//!     handle.send(Input::Quit)?;
//!
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```
mod backends;
mod core;
mod error;
mod events;
mod model;
mod subscribers;

#[cfg(feature = "logging")]
pub mod telemetry;

// ---- Public re-exports ----

pub use self::core::{
    ActiveSequence, AdmissionController, AdmissionToken, Banner, BannerKind, Config,
    DiscoveryProgress, Effect, Engine, EngineBuilder, EngineHandle, Marker, OutputBuffer,
    OutputEntry, Reducer, Sequence, SequenceOrigin, SequenceState, State, StepProgress, View,
    build_sequence,
};
pub use backends::{
    Backends, ComposePlanner, ConfigStore, DiscoveryFeed, DiscoverySender, DiscoveryStreams,
    JsonFileStore, MemoryStore, StatusProber, StepChannels, StepExecutor, StepPlanner,
    StepReporter,
};
pub use error::{AdmissionError, ConfigError, DiscoveryError, RuntimeError, StepError, SubmitError};
pub use events::{
    Bus, Direction, DiscoveryStream, Event, EventKind, Input, Message, MessageSink, StepKey,
};
pub use model::{
    ActionKind, CommandStep, Host, OverallStatus, RuntimeStatus, ServiceRow, StepScope, Target,
    TargetId,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
