//! # Runtime status of a target.
//!
//! A [`RuntimeStatus`] is produced by a [`StatusProber`](crate::StatusProber)
//! inside a worker and stored by the engine keyed by [`TargetId`](crate::TargetId).
//! The last result wins.

use std::fmt;

/// Aggregated health of a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverallStatus {
    /// No result yet.
    #[default]
    Unknown,
    /// Every service is running.
    Up,
    /// No service is running.
    Down,
    /// Some services are running, some are not.
    Partial,
    /// The probe itself failed (see [`RuntimeStatus::error`]).
    Error,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Unknown => "unknown",
            OverallStatus::Up => "up",
            OverallStatus::Down => "down",
            OverallStatus::Partial => "partial",
            OverallStatus::Error => "error",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One service (container) row as reported by the compose tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRow {
    /// Service name.
    pub name: String,
    /// Raw status text (e.g. `"Up 3 hours"`, `"Exited (0) 2 days ago"`).
    pub status: String,
}

impl ServiceRow {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
        }
    }

    /// Returns true if the raw status text describes a running container.
    pub fn is_running(&self) -> bool {
        let s = self.status.trim_start().to_ascii_lowercase();
        s.starts_with("up") || s.starts_with("running")
    }
}

/// Probe result for one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStatus {
    /// Aggregated status.
    pub overall: OverallStatus,
    /// Per-service rows in the order reported.
    pub services: Vec<ServiceRow>,
    /// Probe error, set together with [`OverallStatus::Error`].
    pub error: Option<String>,
}

impl RuntimeStatus {
    /// Builds a status with an explicit overall value and no rows.
    pub fn new(overall: OverallStatus) -> Self {
        Self {
            overall,
            ..Self::default()
        }
    }

    /// Builds an error status carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            overall: OverallStatus::Error,
            services: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// Derives the overall status from service rows.
    ///
    /// - no rows, or no row running → [`OverallStatus::Down`]
    /// - every row running → [`OverallStatus::Up`]
    /// - otherwise → [`OverallStatus::Partial`]
    pub fn from_services(services: Vec<ServiceRow>) -> Self {
        let running = services.iter().filter(|s| s.is_running()).count();
        let overall = match running {
            0 => OverallStatus::Down,
            n if n == services.len() => OverallStatus::Up,
            _ => OverallStatus::Partial,
        };
        Self {
            overall,
            services,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.overall == OverallStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_services_all_running_is_up() {
        let st = RuntimeStatus::from_services(vec![
            ServiceRow::new("web", "Up 3 hours"),
            ServiceRow::new("worker", "running"),
        ]);
        assert_eq!(st.overall, OverallStatus::Up);
        assert_eq!(st.services.len(), 2);
    }

    #[test]
    fn test_from_services_mixed_is_partial() {
        let st = RuntimeStatus::from_services(vec![
            ServiceRow::new("web", "Up 3 hours"),
            ServiceRow::new("db", "Exited (1) 2 minutes ago"),
        ]);
        assert_eq!(st.overall, OverallStatus::Partial);
    }

    #[test]
    fn test_from_services_empty_is_down() {
        assert_eq!(RuntimeStatus::from_services(vec![]).overall, OverallStatus::Down);
    }

    #[test]
    fn test_error_status_carries_message() {
        let st = RuntimeStatus::error("ssh: timeout");
        assert!(st.is_error());
        assert_eq!(st.error.as_deref(), Some("ssh: timeout"));
    }
}
