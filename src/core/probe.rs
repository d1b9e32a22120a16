//! # Gated status probe worker.
//!
//! One worker per [`Effect::Probe`](crate::Effect::Probe):
//!
//! ```text
//! acquire(token) ──Err──────────────────────────────► Error status
//!      │Ok
//!      ▼
//! prober.status(target) ──panic──► Error status
//!      │           └─cancel──────► Error status
//!      ▼
//! release(token) ──► StatusLoaded { run, id, status }
//! ```
//!
//! ## Rules
//! - The worker always reports exactly one `StatusLoaded`, so the loading flag
//!   set by the reducer is always cleared.
//! - The admission token is released before reporting.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backends::StatusProber;
use crate::core::admission::AdmissionController;
use crate::error::panic_message;
use crate::events::{Message, MessageSink};
use crate::model::{RuntimeStatus, Target};

/// Probes `target` under admission and reports the result to `sink`.
pub(crate) async fn probe_target(
    prober: Arc<dyn StatusProber>,
    gate: AdmissionController,
    target: Target,
    run: u64,
    sink: MessageSink,
    token: CancellationToken,
) {
    let status = match gate.acquire(&token).await {
        Ok(permit) => {
            debug!(id = %target.id, in_use = gate.in_use(), "probe admitted");
            let probe = AssertUnwindSafe(prober.status(&target)).catch_unwind();
            let status = tokio::select! {
                res = probe => match res {
                    Ok(status) => status,
                    Err(payload) => {
                        let msg = panic_message(&*payload);
                        warn!(id = %target.id, panic = %msg, "status probe panicked");
                        RuntimeStatus::error(format!("probe panicked: {msg}"))
                    }
                },
                _ = token.cancelled() => RuntimeStatus::error("probe cancelled"),
            };
            gate.release(permit);
            status
        }
        Err(e) => {
            debug!(id = %target.id, label = e.as_label(), "probe not admitted");
            RuntimeStatus::error(e.to_string())
        }
    };

    sink.send(Message::StatusLoaded {
        run,
        id: target.id,
        status,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::model::OverallStatus;

    struct Fixed(OverallStatus);

    #[async_trait]
    impl StatusProber for Fixed {
        async fn status(&self, _: &Target) -> RuntimeStatus {
            RuntimeStatus::new(self.0)
        }
    }

    struct Panicking;

    #[async_trait]
    impl StatusProber for Panicking {
        async fn status(&self, _: &Target) -> RuntimeStatus {
            panic!("docker not installed")
        }
    }

    async fn run_probe(prober: Arc<dyn StatusProber>, gate: AdmissionController) -> RuntimeStatus {
        let (sink, mut rx) = MessageSink::channel();
        let target = Target::new("srv1", "/opt/web", "web");
        probe_target(prober, gate, target.clone(), 7, sink, CancellationToken::new()).await;
        match rx.recv().await {
            Some(Message::StatusLoaded { run, id, status }) => {
                assert_eq!(run, 7);
                assert_eq!(id, target.id);
                status
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reports_prober_result_and_releases() {
        let gate = AdmissionController::new(4);
        let status = run_probe(Arc::new(Fixed(OverallStatus::Up)), gate.clone()).await;
        assert_eq!(status.overall, OverallStatus::Up);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn test_panic_becomes_error_status() {
        let gate = AdmissionController::new(4);
        let status = run_probe(Arc::new(Panicking), gate.clone()).await;
        assert!(status.is_error());
        assert!(status.error.unwrap().contains("docker not installed"));
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn test_closed_gate_becomes_error_status() {
        let gate = AdmissionController::new(4);
        gate.close();
        let status = run_probe(Arc::new(Fixed(OverallStatus::Up)), gate).await;
        assert!(status.is_error());
    }
}
