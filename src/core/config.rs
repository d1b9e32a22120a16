//! # Engine configuration.
//!
//! [`Config`] centralizes the few knobs of the engine runtime.
//!
//! ## Sentinel values
//! - `probe_concurrency = 0` → treated as 1 (the gate always admits someone)
//! - `bus_capacity = 0` → treated as 1
//! - `grace = 0s` → do not wait for workers on shutdown
//! - `output_linger = 0s` → resolve a step as soon as its result arrives

use std::time::Duration;

/// Engine runtime configuration.
///
/// ## Field semantics
/// - `probe_concurrency`: maximum status probes holding an admission token at once
/// - `bus_capacity`: event bus ring buffer size
/// - `grace`: maximum wait for workers after shutdown is requested
/// - `handle_signals`: stop the engine on SIGINT/SIGTERM/SIGHUP (Ctrl-C on Windows)
/// - `output_linger`: bound on waiting for step output after the step's result
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of concurrent status probes.
    pub probe_concurrency: usize,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Subscribers lagging behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Maximum time to wait for in-flight workers on shutdown.
    ///
    /// Workers are cancelled first; the ones that do not exit in time are
    /// reported through [`RuntimeError::GraceExceeded`](crate::RuntimeError::GraceExceeded).
    pub grace: Duration,

    /// Whether [`Engine::run`](crate::Engine::run) listens for OS termination signals.
    ///
    /// Leave disabled when the embedding UI owns the terminal and maps Ctrl-C to
    /// [`Input::Quit`](crate::Input::Quit) itself.
    pub handle_signals: bool,

    /// How long a step that reported its result may keep its output open.
    ///
    /// Lines still queued when the result arrives are forwarded first; once
    /// this elapses the step is resolved and later lines are dropped.
    pub output_linger: Duration,
}

impl Config {
    /// Returns the admission capacity, clamped to a minimum of 1.
    #[inline]
    pub fn probe_limit(&self) -> usize {
        self.probe_concurrency.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `probe_concurrency = 4`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    /// - `handle_signals = false`
    /// - `output_linger = 2s`
    fn default() -> Self {
        Self {
            probe_concurrency: 4,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
            handle_signals: false,
            output_linger: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps_probes_at_four() {
        assert_eq!(Config::default().probe_limit(), 4);
    }

    #[test]
    fn test_zero_sentinels_are_clamped() {
        let cfg = Config {
            probe_concurrency: 0,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.probe_limit(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
