//! # Observations published by the engine.
//!
//! The [`EventKind`] enum classifies events across four groups:
//! - **Discovery**: runs starting and finishing, targets and errors arriving
//! - **Status**: probe results
//! - **Sequence**: steps starting, succeeding, failing; sequences resolving
//! - **Runtime**: configuration, shutdown and subscriber health
//!
//! Each event carries a global monotonic `seq` so subscribers can restore
//! publication order.
//!
//! ## Example
//! ```rust
//! use stackvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StepFailed)
//!     .with_target("web@srv1")
//!     .with_step("pull")
//!     .with_index(1)
//!     .with_reason("exit status 1");
//!
//! assert_eq!(ev.kind, EventKind::StepFailed);
//! assert_eq!(ev.step.as_deref(), Some("pull"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Discovery ===
    /// A discovery run started. Sets `count` (number of hosts).
    DiscoveryStarted,
    /// A target was appended. Sets `target`.
    TargetDiscovered,
    /// The feed reported an error. Sets `reason`.
    DiscoveryErrored,
    /// The run completed. Sets `count` (targets) and `reason` (banner text, if any).
    DiscoveryFinished,

    // === Status ===
    /// A probe result was stored. Sets `target`, `reason` (overall status).
    StatusLoaded,

    // === Sequence ===
    /// A sequence was built and started. Sets `count` (steps).
    SequenceStarted,
    /// A step was dispatched. Sets `target`, `step`, `index`.
    StepStarting,
    /// A step succeeded. Sets `target`, `step`, `index`.
    StepSucceeded,
    /// A step failed. Sets `target`, `step`, `index`, `reason`.
    StepFailed,
    /// Every step succeeded. Sets `count` (steps).
    SequenceCompleted,
    /// The sequence aborted. Sets `index` (failed step), `reason`.
    SequenceFailed,
    /// A host action resolved and the host list is being reloaded. Sets `target` (host).
    HostActionResolved,

    // === Runtime ===
    /// The host list was (re)loaded. Sets `count`.
    HostsLoaded,
    /// Loading or saving the host list failed. Sets `reason`.
    ConfigFailed,
    /// Shutdown was requested.
    ShutdownRequested,
    /// All workers stopped within the grace period.
    AllStoppedWithin,
    /// Grace period exceeded. Sets `count` (workers still running).
    GraceExceeded,
    /// A subscriber dropped an event. Sets `target` (subscriber), `reason`.
    SubscriberOverflow,
    /// A subscriber panicked. Sets `target` (subscriber), `reason`.
    SubscriberPanicked,
}

/// Engine event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Target, host or subscriber the event is about.
    pub target: Option<Arc<str>>,
    /// Step name.
    pub step: Option<Arc<str>>,
    /// Step index within its sequence.
    pub index: Option<u32>,
    /// Count (hosts, targets, steps, workers; depends on kind).
    pub count: Option<u32>,
    /// Human-readable detail (errors, status text).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            target: None,
            step: None,
            index: None,
            count: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[inline]
    pub fn with_step(mut self, step: impl Into<Arc<str>>) -> Self {
        self.step = Some(step.into());
        self
    }

    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(clamp_u32(index));
        self
    }

    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(clamp_u32(count));
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_target(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_target(subscriber)
            .with_reason(info)
    }
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
