//! Messages, observations and the channels that carry them.
//!
//! Two kinds of traffic flow through the engine:
//!
//! - [`Message`] the closed set of inputs to the reducer. Workers and the user
//!   surface send them through a [`MessageSink`] (unbounded mpsc, one consumer).
//! - [`Event`] observations the reducer publishes on the [`Bus`] (broadcast) for
//!   subscribers: logging, renderers, test probes.
//!
//! ```text
//! workers ──► MessageSink ──► Engine loop ──► Reducer::reduce
//!                                                 │
//!                                                 └─► Effect::Publish(Event) ──► Bus ──► SubscriberSet
//! ```

mod bus;
mod event;
mod message;
mod sink;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use message::{Direction, DiscoveryStream, Input, Message, StepKey};
pub use sink::MessageSink;
