//! # Discovery ingestion workers.
//!
//! Three independent workers drain one discovery run:
//!
//! ```text
//! targets ──► forward one, re-arm ──► TargetDiscovered*  then DiscoveryStreamClosed(Targets)
//! errors  ──► forward one, re-arm ──► DiscoveryError*    then DiscoveryStreamClosed(Errors)
//! done    ──► fired or dropped    ──► DiscoveryDone
//! ```
//!
//! Every message is tagged with the run it belongs to. On cancellation the
//! workers exit without reporting.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::backends::DiscoveryStreams;
use crate::events::{DiscoveryStream, Message, MessageSink};

/// Spawns the three drain workers of discovery run `run` on `tracker`.
pub(crate) fn spawn_ingest(
    tracker: &TaskTracker,
    streams: DiscoveryStreams,
    run: u64,
    sink: &MessageSink,
    token: &CancellationToken,
) {
    let DiscoveryStreams {
        targets,
        errors,
        done,
    } = streams;

    tracker.spawn(drain(
        targets,
        DiscoveryStream::Targets,
        run,
        sink.clone(),
        token.clone(),
        move |target| Message::TargetDiscovered { run, target },
    ));
    tracker.spawn(drain(
        errors,
        DiscoveryStream::Errors,
        run,
        sink.clone(),
        token.clone(),
        move |error| Message::DiscoveryError { run, error },
    ));

    let sink = sink.clone();
    let token = token.clone();
    tracker.spawn(async move {
        tokio::select! {
            // A dropped sender counts as done.
            _ = done => {
                sink.send(Message::DiscoveryDone { run });
            }
            _ = token.cancelled() => {}
        }
    });
}

/// Forwards items one at a time until the source closes.
async fn drain<T, F>(
    mut rx: mpsc::Receiver<T>,
    stream: DiscoveryStream,
    run: u64,
    sink: MessageSink,
    token: CancellationToken,
    wrap: F,
) where
    T: Send,
    F: Fn(T) -> Message + Send,
{
    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(item) => {
                    if !sink.send(wrap(item)) {
                        return;
                    }
                }
                None => break,
            },
            _ = token.cancelled() => {
                debug!(run, ?stream, "discovery drain cancelled");
                return;
            }
        }
    }
    sink.send(Message::DiscoveryStreamClosed { run, stream });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use crate::model::Target;

    #[tokio::test]
    async fn test_forwards_everything_then_closes() {
        let (sender, streams) = DiscoveryStreams::channel(8);
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        spawn_ingest(&tracker, streams, 3, &sink, &CancellationToken::new());
        drop(sink);

        sender
            .targets
            .send(Target::new("srv1", "/opt/web", "web"))
            .await
            .unwrap();
        sender
            .errors
            .send(DiscoveryError::on_host("srv2", "timeout"))
            .await
            .unwrap();
        sender.finish();

        tracker.close();
        tracker.wait().await;

        let mut targets = 0;
        let mut errors = 0;
        let mut closed = 0;
        let mut done = 0;
        while let Some(msg) = rx.recv().await {
            match msg {
                Message::TargetDiscovered { run: 3, .. } => targets += 1,
                Message::DiscoveryError { run: 3, .. } => errors += 1,
                Message::DiscoveryStreamClosed { run: 3, .. } => closed += 1,
                Message::DiscoveryDone { run: 3 } => done += 1,
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!((targets, errors, closed, done), (1, 1, 2, 1));
    }

    #[tokio::test]
    async fn test_dropped_done_counts_as_done() {
        let (sender, streams) = DiscoveryStreams::channel(1);
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        spawn_ingest(&tracker, streams, 1, &sink, &CancellationToken::new());
        drop(sink);
        drop(sender);

        tracker.close();
        tracker.wait().await;

        let mut saw_done = false;
        while let Some(msg) = rx.recv().await {
            if matches!(msg, Message::DiscoveryDone { run: 1 }) {
                saw_done = true;
            }
        }
        assert!(saw_done);
    }

    #[tokio::test]
    async fn test_cancel_stops_workers() {
        let (_sender, streams) = DiscoveryStreams::channel(1);
        let (sink, mut rx) = MessageSink::channel();
        let tracker = TaskTracker::new();
        let token = CancellationToken::new();
        spawn_ingest(&tracker, streams, 1, &sink, &token);
        drop(sink);

        token.cancel();
        tracker.close();
        tracker.wait().await;
        assert!(rx.recv().await.is_none());
    }
}
