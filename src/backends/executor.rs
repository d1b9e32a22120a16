//! # Step executor.
//!
//! Executes one [`CommandStep`] and exposes its progress as a channel pair:
//!
//! ```text
//! StepReporter ── line() ──► output: mpsc::Receiver<String>   (zero or more lines)
//!              ── finish() ─► result: oneshot::Receiver<Result<(), StepError>>
//! ```
//!
//! ## Contract
//! - Lines are delivered in the order the command produced them, without the
//!   trailing newline.
//! - The output stream closes when the reporter is finished or dropped.
//! - Dropping the reporter without calling [`StepReporter::finish`] is reported
//!   as [`StepError::ResultDropped`].

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::StepError;
use crate::model::CommandStep;

/// Receiving side of one executing step, consumed by the engine.
#[derive(Debug)]
pub struct StepChannels {
    pub output: mpsc::Receiver<String>,
    pub result: oneshot::Receiver<Result<(), StepError>>,
}

/// Sending side of one executing step, held by the executor.
#[derive(Debug)]
pub struct StepReporter {
    output: mpsc::Sender<String>,
    result: oneshot::Sender<Result<(), StepError>>,
}

impl StepChannels {
    /// Creates a connected reporter/channels pair.
    pub fn pair(capacity: usize) -> (StepReporter, StepChannels) {
        let (out_tx, out_rx) = mpsc::channel(capacity.max(1));
        let (res_tx, res_rx) = oneshot::channel();
        (
            StepReporter {
                output: out_tx,
                result: res_tx,
            },
            StepChannels {
                output: out_rx,
                result: res_rx,
            },
        )
    }
}

impl StepReporter {
    /// Forwards one output line. Returns `false` once nobody is reading.
    pub async fn line(&self, line: impl Into<String>) -> bool {
        self.output.send(line.into()).await.is_ok()
    }

    /// Closes the output stream and reports the terminal result.
    pub fn finish(self, result: Result<(), StepError>) {
        let StepReporter { output, result: tx } = self;
        drop(output);
        let _ = tx.send(result);
    }
}

/// Runs command steps.
#[async_trait]
pub trait StepExecutor: Send + Sync + 'static {
    /// Starts `step` and returns its channel pair.
    ///
    /// Returns `Err` only if the step could not be started at all.
    async fn execute(&self, step: &CommandStep) -> Result<StepChannels, StepError>;
}
