//! # Host configuration store.
//!
//! - [`MemoryStore`] keeps the list in process (tests, embedding).
//! - [`JsonFileStore`] persists it as pretty-printed JSON.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::model::Host;

/// Persistent host list.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    async fn load(&self) -> Result<Vec<Host>, ConfigError>;
    async fn save(&self, hosts: &[Host]) -> Result<(), ConfigError>;
}

/// In-process host list.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hosts: Mutex<Vec<Host>>,
}

impl MemoryStore {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self {
            hosts: Mutex::new(hosts),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Host>, ConfigError> {
        let hosts = self
            .hosts
            .lock()
            .map_err(|_| ConfigError::Io("memory store poisoned".into()))?;
        Ok(hosts.clone())
    }

    async fn save(&self, hosts: &[Host]) -> Result<(), ConfigError> {
        let mut stored = self
            .hosts
            .lock()
            .map_err(|_| ConfigError::Io("memory store poisoned".into()))?;
        *stored = hosts.to_vec();
        Ok(())
    }
}

/// Host list stored in a JSON file.
///
/// A missing file loads as an empty list. Parent directories are created on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Host>, ConfigError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn save(&self, hosts: &[Host]) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let raw = serde_json::to_vec_pretty(hosts)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::default();
        assert!(store.load().await.unwrap().is_empty());

        store.save(&[Host::new("srv1", "10.0.0.5")]).await.unwrap();
        assert_eq!(store.load().await.unwrap()[0].name, "srv1");
    }

    #[tokio::test]
    async fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("hosts.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/cfg/hosts.json"));
        let hosts = vec![Host::new("srv1", "10.0.0.5").with_user("deploy").with_port(2222)];

        store.save(&hosts).await.unwrap();
        assert_eq!(store.load().await.unwrap(), hosts);
    }

    #[tokio::test]
    async fn test_json_store_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }
}
