//! # Engine handle.

use crate::error::SubmitError;
use crate::events::{Input, Message, MessageSink};

/// Cloneable handle used by front-ends to submit [`Input`]s.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    sink: MessageSink,
}

impl EngineHandle {
    pub(crate) fn new(sink: MessageSink) -> Self {
        Self { sink }
    }

    /// Queues `input` for the engine loop.
    pub fn send(&self, input: Input) -> Result<(), SubmitError> {
        if self.sink.send(Message::Input(input)) {
            Ok(())
        } else {
            Err(SubmitError::Closed)
        }
    }

    /// Shorthand for `send(Input::Quit)`.
    pub fn quit(&self) -> Result<(), SubmitError> {
        self.send(Input::Quit)
    }

    /// Returns true once the engine has stopped.
    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }
}
