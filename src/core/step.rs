//! # Step workers.
//!
//! A step goes through three workers, each reporting to the engine:
//!
//! ```text
//! DispatchStep ─► dispatch_step ──Ok──► StepChannelsReady
//!                               └─Err─► StepFinished(Err)
//! ConsumeStep  ─► drain_output  ──────► StepOutput*, StepOutputClosed
//!              └► await_result  ──────► StepFinished
//! ```
//!
//! ## Rules
//! - `drain_output` keeps a single read outstanding and forwards lines verbatim.
//! - `await_result` holds the result back until the output closes, for at most
//!   the configured linger, so every line drained in time precedes
//!   `StepFinished`. An executor that keeps its output open cannot stall the
//!   sequence.
//! - A result sender dropped without reporting is [`StepError::ResultDropped`].
//! - Cancellation is reported as [`StepError::Cancelled`]; the output drain just
//!   stops.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::backends::{StepChannels, StepExecutor};
use crate::error::{StepError, panic_message};
use crate::events::{Message, MessageSink, StepKey};
use crate::model::CommandStep;

/// Asks the executor to start `command`.
pub(crate) async fn dispatch_step(
    executor: Arc<dyn StepExecutor>,
    step: StepKey,
    command: CommandStep,
    sink: MessageSink,
    token: CancellationToken,
) {
    let started = AssertUnwindSafe(executor.execute(&command)).catch_unwind();
    let started = tokio::select! {
        res = started => match res {
            Ok(res) => res,
            Err(payload) => Err(StepError::failed(format!(
                "executor panicked: {}",
                panic_message(&*payload)
            ))),
        },
        _ = token.cancelled() => Err(StepError::Cancelled),
    };

    let msg = match started {
        Ok(channels) => Message::StepChannelsReady { step, channels },
        Err(error) => {
            warn!(step = %command.label(), error = %error, "step did not start");
            Message::StepFinished {
                step,
                result: Err(error),
            }
        }
    };
    sink.send(msg);
}

/// Spawns the output drain and the result waiter of a started step.
pub(crate) fn consume_step(
    tracker: &TaskTracker,
    step: StepKey,
    channels: StepChannels,
    linger: Duration,
    sink: &MessageSink,
    token: &CancellationToken,
) {
    let StepChannels { output, result } = channels;
    let (closed_tx, closed_rx) = oneshot::channel();
    tracker.spawn(drain_output(output, closed_tx, step, sink.clone(), token.clone()));
    tracker.spawn(await_result(
        result,
        closed_rx,
        linger,
        step,
        sink.clone(),
        token.clone(),
    ));
}

/// Dropping `_closed` on exit releases the result waiter.
async fn drain_output(
    mut output: mpsc::Receiver<String>,
    _closed: oneshot::Sender<()>,
    step: StepKey,
    sink: MessageSink,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            line = output.recv() => match line {
                Some(line) => {
                    if !sink.send(Message::StepOutput { step, line }) {
                        return;
                    }
                }
                None => break,
            },
            _ = token.cancelled() => {
                debug!(?step, "output drain cancelled");
                return;
            }
        }
    }
    sink.send(Message::StepOutputClosed { step });
}

async fn await_result(
    result: oneshot::Receiver<Result<(), StepError>>,
    closed: oneshot::Receiver<()>,
    linger: Duration,
    step: StepKey,
    sink: MessageSink,
    token: CancellationToken,
) {
    let result = tokio::select! {
        res = result => res.unwrap_or(Err(StepError::ResultDropped)),
        _ = token.cancelled() => Err(StepError::Cancelled),
    };
    if !token.is_cancelled() && tokio::time::timeout(linger, closed).await.is_err() {
        warn!(?step, ?linger, "step output still open after its result");
    }
    sink.send(Message::StepFinished { step, result });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::model::{ActionKind, Target};

    const KEY: StepKey = StepKey {
        sequence: 1,
        index: 0,
    };

    const LINGER: Duration = Duration::from_secs(2);

    fn command() -> CommandStep {
        CommandStep::for_target("up", &Target::new("srv1", "/opt/web", "web"), ActionKind::Start)
    }

    struct Unreachable;

    #[async_trait]
    impl StepExecutor for Unreachable {
        async fn execute(&self, _: &CommandStep) -> Result<StepChannels, StepError> {
            Err(StepError::spawn("ssh: no route to host"))
        }
    }

    #[tokio::test]
    async fn test_start_failure_is_reported_as_finished() {
        let (sink, mut rx) = MessageSink::channel();
        dispatch_step(Arc::new(Unreachable), KEY, command(), sink, CancellationToken::new()).await;
        match rx.recv().await {
            Some(Message::StepFinished { step, result }) => {
                assert_eq!(step, KEY);
                assert!(matches!(result, Err(StepError::Spawn { .. })));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lines_forwarded_in_order_then_closed() {
        let (reporter, channels) = StepChannels::pair(1);
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        consume_step(&tracker, KEY, channels, LINGER, &sink, &CancellationToken::new());
        drop(sink);

        tokio::spawn(async move {
            for l in ["X", "  Y  ", ""] {
                reporter.line(l).await;
            }
            reporter.finish(Ok(()));
        });
        tracker.close();
        tracker.wait().await;

        let mut lines = Vec::new();
        let mut closed = false;
        let mut finished = None;
        while let Some(msg) = rx.recv().await {
            match msg {
                Message::StepOutput { line, .. } => {
                    assert!(!closed, "line after close");
                    lines.push(line);
                }
                Message::StepOutputClosed { .. } => closed = true,
                Message::StepFinished { result, .. } => {
                    assert!(closed, "result before output close");
                    finished = Some(result);
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(lines, ["X", "  Y  ", ""]);
        assert!(closed);
        assert_eq!(finished, Some(Ok(())));
    }

    #[tokio::test]
    async fn test_dropped_reporter_is_a_failure() {
        let (reporter, channels) = StepChannels::pair(1);
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        consume_step(&tracker, KEY, channels, LINGER, &sink, &CancellationToken::new());
        drop(sink);
        drop(reporter);
        tracker.close();
        tracker.wait().await;

        let mut finished = None;
        while let Some(msg) = rx.recv().await {
            if let Message::StepFinished { result, .. } = msg {
                finished = Some(result);
            }
        }
        assert_eq!(finished, Some(Err(StepError::ResultDropped)));
    }

    #[tokio::test]
    async fn test_cancel_reports_cancelled_result() {
        let (_reporter, channels) = StepChannels::pair(1);
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        let token = CancellationToken::new();
        consume_step(&tracker, KEY, channels, LINGER, &sink, &token);
        drop(sink);
        token.cancel();
        tracker.close();
        tracker.wait().await;

        let msgs: Vec<Message> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(matches!(
            msgs.as_slice(),
            [Message::StepFinished { result: Err(StepError::Cancelled), .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_output_does_not_hold_result_forever() {
        let (out_tx, output) = mpsc::channel(4);
        let (res_tx, result) = oneshot::channel();
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        consume_step(
            &tracker,
            KEY,
            StepChannels { output, result },
            LINGER,
            &sink,
            &CancellationToken::new(),
        );

        out_tx.send("before".to_string()).await.unwrap();
        res_tx.send(Err(StepError::failed("exit status 1"))).unwrap();

        let started = tokio::time::Instant::now();
        let mut lines = Vec::new();
        let finished = loop {
            match rx.recv().await {
                Some(Message::StepOutput { line, .. }) => lines.push(line),
                Some(Message::StepFinished { result, .. }) => break result,
                other => panic!("unexpected message: {other:?}"),
            }
        };
        assert_eq!(lines, ["before"]);
        assert_eq!(finished, Err(StepError::failed("exit status 1")));
        assert!(started.elapsed() >= LINGER);
        drop(out_tx);
    }
}
