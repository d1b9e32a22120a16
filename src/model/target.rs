//! # Discovered targets.

use std::fmt;
use std::sync::Arc;

/// Unique identifier of a target: server name plus project path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(Arc<str>);

impl TargetId {
    /// Builds the identifier for the project at `path` on `server`.
    pub fn new(server: &str, path: &str) -> Self {
        Self(format!("{server}:{path}").into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// Immutable descriptor of one compose project on one server.
///
/// Created by the discovery feed and appended, in arrival order, to the
/// target list owned by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// Unique identifier (`server:path`).
    pub id: TargetId,
    /// Display name (usually the project directory name).
    pub name: String,
    /// Name of the server the project lives on.
    pub server: String,
}

impl Target {
    /// Creates a target for the project at `path` on `server`.
    pub fn new(server: impl Into<String>, path: &str, name: impl Into<String>) -> Self {
        let server = server.into();
        Self {
            id: TargetId::new(&server, path),
            name: name.into(),
            server,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_combines_server_and_path() {
        let t = Target::new("srv1", "/opt/web", "web");
        assert_eq!(t.id.as_str(), "srv1:/opt/web");
        assert_eq!(t.to_string(), "web@srv1");
    }

    #[test]
    fn test_same_path_on_other_server_is_distinct() {
        let a = Target::new("srv1", "/opt/web", "web");
        let b = Target::new("srv2", "/opt/web", "web");
        assert_ne!(a.id, b.id);
    }
}
