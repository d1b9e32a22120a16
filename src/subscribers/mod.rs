//! # Event subscribers.
//!
//! ```text
//! Engine ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                     ├──► LogWriter
//!                                                     └──► user subscribers
//! ```

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
