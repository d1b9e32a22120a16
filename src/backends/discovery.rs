//! # Discovery feed.
//!
//! A feed reports targets and errors on two independent streams and signals
//! completion on a third. The engine drains all three concurrently.
//!
//! ## Contract
//! - Both streams close when the feed drops its senders.
//! - `done` fires (or is dropped) once the feed has nothing more to report.
//! - Errors are non-fatal: the feed keeps going after reporting one.

use tokio::sync::{mpsc, oneshot};

use crate::error::DiscoveryError;
use crate::model::{Host, Target};

/// Receiving side of one discovery run.
pub struct DiscoveryStreams {
    pub targets: mpsc::Receiver<Target>,
    pub errors: mpsc::Receiver<DiscoveryError>,
    pub done: oneshot::Receiver<()>,
}

/// Sending side of one discovery run, held by the feed implementation.
pub struct DiscoverySender {
    pub targets: mpsc::Sender<Target>,
    pub errors: mpsc::Sender<DiscoveryError>,
    pub done: oneshot::Sender<()>,
}

impl DiscoveryStreams {
    /// Creates a connected sender/receiver pair with bounded streams.
    pub fn channel(capacity: usize) -> (DiscoverySender, DiscoveryStreams) {
        let capacity = capacity.max(1);
        let (targets_tx, targets_rx) = mpsc::channel(capacity);
        let (errors_tx, errors_rx) = mpsc::channel(capacity);
        let (done_tx, done_rx) = oneshot::channel();
        (
            DiscoverySender {
                targets: targets_tx,
                errors: errors_tx,
                done: done_tx,
            },
            DiscoveryStreams {
                targets: targets_rx,
                errors: errors_rx,
                done: done_rx,
            },
        )
    }
}

impl DiscoverySender {
    /// Closes both streams and fires the completion signal.
    pub fn finish(self) {
        let DiscoverySender { targets, errors, done } = self;
        drop(targets);
        drop(errors);
        let _ = done.send(());
    }
}

/// Source of targets for the configured hosts.
pub trait DiscoveryFeed: Send + Sync + 'static {
    /// Starts one discovery run over `hosts`.
    ///
    /// Implementations spawn their own producers and return immediately.
    fn start(&self, hosts: &[Host]) -> DiscoveryStreams;
}
