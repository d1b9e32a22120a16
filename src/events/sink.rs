//! # Message sink handed to every worker.
//!
//! Workers never touch engine state. They receive a [`MessageSink`] when they
//! are spawned and report results through it; the engine loop is the single
//! consumer. Sending never blocks, so a worker can always report and exit.

use tokio::sync::mpsc;

use super::message::Message;

/// Cloneable sending half of the engine inbox.
#[derive(Clone, Debug)]
pub struct MessageSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl MessageSink {
    /// Creates a sink and the receiver that drains it.
    ///
    /// Tests use the receiver directly as a fake engine.
    pub fn channel() -> (MessageSink, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MessageSink { tx }, rx)
    }

    /// Delivers `msg` to the engine. Returns `false` once the engine is gone.
    pub fn send(&self, msg: Message) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
