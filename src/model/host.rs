//! # Configured hosts.
//!
//! Hosts are persisted by a [`ConfigStore`](crate::ConfigStore). Discovery runs
//! against the current host list, and host-level actions target one of them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One machine reachable over SSH.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Unique display name; also used as the server name of its targets.
    pub name: String,
    /// Hostname or IP address.
    pub address: String,
    /// Login user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// SSH port (22 when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Private key used to authenticate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

impl Host {
    /// Creates a host with default user, port and key.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            user: None,
            port: None,
            identity_file: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Effective SSH port.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(22)
    }
}
