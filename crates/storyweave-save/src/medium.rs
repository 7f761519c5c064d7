//! Key/value storage backends.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use storyweave_core::error::EngineError;

/// Durable string storage. Keys are flat; values are opaque to the medium.
#[async_trait]
pub trait SaveMedium: Send + Sync {
    /// Reads the value under `key`, `None` when absent.
    async fn read(&self, key: &str) -> Result<Option<String>, EngineError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn write(&self, key: &str, value: &str) -> Result<(), EngineError>;

    /// Removes the value under `key`. Removing an absent key is not an
    /// error.
    async fn remove(&self, key: &str) -> Result<(), EngineError>;
}

/// In-memory medium. Nothing survives the process; used by tests and
/// ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaveMedium for MemoryMedium {
    async fn read(&self, key: &str) -> Result<Option<String>, EngineError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::Storage("storage lock poisoned".to_owned()))?;
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::Storage("storage lock poisoned".to_owned()))?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), EngineError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::Storage("storage lock poisoned".to_owned()))?;
        entries.remove(key);
        Ok(())
    }
}

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl SaveMedium for FileMedium {
    async fn read(&self, key: &str) -> Result<Option<String>, EngineError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::Storage(format!("read {key}: {e}"))),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| EngineError::Storage(format!("create {}: {e}", self.root.display())))?;
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|e| EngineError::Storage(format!("write {key}: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<(), EngineError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::Storage(format!("remove {key}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_medium_round_trips() {
        let medium = MemoryMedium::new();
        assert_eq!(medium.read("slot").await.unwrap(), None);

        medium.write("slot", "blob").await.unwrap();
        assert_eq!(medium.read("slot").await.unwrap(), Some("blob".to_owned()));

        medium.remove("slot").await.unwrap();
        assert_eq!(medium.read("slot").await.unwrap(), None);
        medium.remove("slot").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_medium_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let medium = FileMedium::new(dir.path().join("saves"));
        assert_eq!(medium.read("slot_0").await.unwrap(), None);

        medium.write("slot_0", r#"{"version":"1.0.0"}"#).await.unwrap();
        assert_eq!(
            medium.read("slot_0").await.unwrap(),
            Some(r#"{"version":"1.0.0"}"#.to_owned())
        );

        medium.remove("slot_0").await.unwrap();
        assert_eq!(medium.read("slot_0").await.unwrap(), None);
    }
}
