//! # LogWriter: events rendered through `tracing`.
//!
//! ```text
//! INFO  step starting subject="web@srv1" step="pull" index=0
//! WARN  step failed subject="web@srv1" step="pull" index=0 reason="exit status 1"
//! INFO  discovery finished count=3
//! ```
//!
//! Install a `tracing` subscriber (e.g. with the `logging` feature and
//! `telemetry::init`) to see the output.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs every event.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subject = e.target.as_deref().unwrap_or("-");
        let step = e.step.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::DiscoveryStarted => info!(hosts = ?e.count, "discovery started"),
            EventKind::TargetDiscovered => debug!(subject, "target discovered"),
            EventKind::DiscoveryErrored => warn!(reason, "discovery error"),
            EventKind::DiscoveryFinished => info!(count = ?e.count, reason, "discovery finished"),
            EventKind::StatusLoaded => debug!(subject, reason, "status loaded"),
            EventKind::SequenceStarted => info!(steps = ?e.count, action = reason, "sequence started"),
            EventKind::StepStarting => info!(subject, step, index = ?e.index, "step starting"),
            EventKind::StepSucceeded => info!(subject, step, index = ?e.index, "step succeeded"),
            EventKind::StepFailed => warn!(subject, step, index = ?e.index, reason, "step failed"),
            EventKind::SequenceCompleted => info!(steps = ?e.count, "sequence completed"),
            EventKind::SequenceFailed => warn!(index = ?e.index, reason, "sequence failed"),
            EventKind::HostActionResolved => info!(host = subject, reason, "host action resolved"),
            EventKind::HostsLoaded => debug!(count = ?e.count, "hosts loaded"),
            EventKind::ConfigFailed => warn!(reason, "host configuration failed"),
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStoppedWithin => info!("all workers stopped within grace"),
            EventKind::GraceExceeded => warn!(stuck = ?e.count, "grace exceeded"),
            EventKind::SubscriberOverflow => warn!(subscriber = subject, reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => warn!(subscriber = subject, reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
