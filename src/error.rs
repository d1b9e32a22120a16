//! Error types used by the engine, its workers and the collaborators.
//!
//! Every domain error in this crate travels **as data**: workers put it in a
//! [`Message`](crate::Message) and the reducer narrows its blast radius to the
//! smallest affected unit (one status entry, one sequence, one banner).
//!
//! - [`RuntimeError`] the only error [`Engine::run`](crate::Engine::run) returns.
//! - [`AdmissionError`] a probe could not obtain an admission token.
//! - [`StepError`] a command step failed; fatal to the current sequence only.
//! - [`DiscoveryError`] a non-fatal discovery problem, accumulated per run.
//! - [`ConfigError`] the host configuration store failed.
//! - [`SubmitError`] an input could not be handed to the engine.
//!
//! All enums provide `as_label` for logs.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the engine runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Workers were still running when the shutdown grace period elapsed.
    #[error("shutdown timeout {grace:?} exceeded; {stuck} worker(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of workers that did not stop in time.
        stuck: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use stackvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: 2 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Failure to obtain an admission token for a status probe.
///
/// Never surfaces on its own: the probe worker turns it into an
/// [`OverallStatus::Error`](crate::OverallStatus::Error) entry for the target.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The controller was closed (engine shutting down).
    #[error("admission controller closed")]
    Closed,

    /// The waiting worker was cancelled.
    #[error("admission wait cancelled")]
    Cancelled,
}

impl AdmissionError {
    pub fn as_label(&self) -> &'static str {
        match self {
            AdmissionError::Closed => "admission_closed",
            AdmissionError::Cancelled => "admission_cancelled",
        }
    }
}

/// # Failure of a single command step.
///
/// Aborts the remaining steps of the sequence it belongs to. Effects of the
/// steps that already succeeded are left as they are.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The command ran and reported a failure.
    #[error("{message}")]
    Failed {
        /// Message reported by the executor.
        message: String,
    },

    /// The executor could not start the command.
    #[error("failed to start: {message}")]
    Spawn {
        /// Underlying reason.
        message: String,
    },

    /// The executor dropped the result channel without reporting.
    #[error("step ended without reporting a result")]
    ResultDropped,

    /// The engine shut down while the step was running.
    #[error("cancelled")]
    Cancelled,
}

impl StepError {
    /// Shorthand for [`StepError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed {
            message: message.into(),
        }
    }

    /// Shorthand for [`StepError::Spawn`].
    pub fn spawn(message: impl Into<String>) -> Self {
        StepError::Spawn {
            message: message.into(),
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            StepError::Failed { .. } => "step_failed",
            StepError::Spawn { .. } => "step_spawn_failed",
            StepError::ResultDropped => "step_result_dropped",
            StepError::Cancelled => "step_cancelled",
        }
    }
}

/// # Non-fatal problem reported by the discovery feed.
///
/// Accumulated for the current discovery run; discovery keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.as_message())]
pub struct DiscoveryError {
    /// Host the problem relates to, if any.
    pub host: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl DiscoveryError {
    /// Creates an error not tied to a particular host.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            host: None,
            message: message.into(),
        }
    }

    /// Creates an error attributed to `host`.
    pub fn on_host(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            message: message.into(),
        }
    }

    /// Returns the message prefixed with the host name when known.
    pub fn as_message(&self) -> String {
        match &self.host {
            Some(host) => format!("{host}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// # Failure of the host configuration store.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Reading or writing the backing storage failed.
    #[error("config io error: {0}")]
    Io(String),

    /// The stored data could not be (de)serialized.
    #[error("config parse error: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io(_) => "config_io",
            ConfigError::Parse(_) => "config_parse",
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// # Input rejected by [`EngineHandle::send`](crate::EngineHandle::send).
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The engine loop is gone.
    #[error("engine is not running")]
    Closed,
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_error_message_includes_host() {
        let err = DiscoveryError::on_host("srv1", "ssh: connection refused");
        assert_eq!(err.to_string(), "srv1: ssh: connection refused");

        let err = DiscoveryError::new("no hosts configured");
        assert_eq!(err.to_string(), "no hosts configured");
    }

    #[test]
    fn test_step_error_display() {
        assert_eq!(StepError::failed("exit status 1").to_string(), "exit status 1");
        assert_eq!(
            StepError::spawn("no such host").to_string(),
            "failed to start: no such host"
        );
        assert_eq!(StepError::ResultDropped.as_label(), "step_result_dropped");
    }

    #[test]
    fn test_config_error_from_serde() {
        let err: ConfigError = serde_json::from_str::<Vec<u32>>("{").unwrap_err().into();
        assert_eq!(err.as_label(), "config_parse");
    }

    #[test]
    fn test_panic_message_downcasts() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
