use std::sync::Arc;

use crate::backends::Backends;
use crate::core::{Config, Engine};
use crate::subscribers::Subscribe;

/// Builder for an [`Engine`].
pub struct EngineBuilder {
    cfg: Config,
    backends: Backends,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl EngineBuilder {
    pub fn new(cfg: Config, backends: Backends) -> Self {
        Self {
            cfg,
            backends,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive engine events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build(self) -> Engine {
        Engine::new_internal(self.cfg, self.backends, self.subscribers)
    }
}
