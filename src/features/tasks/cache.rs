//! # Local Cache
//!
//! Small JSON key-value file used as the offline copy of backend data.
//! Every write rewrites the whole file through a temp file and a rename,
//! so readers never observe a half-written cache.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const CACHE_FILE_NAME: &str = "cache.json";

pub struct LocalCache {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl LocalCache {
    /// Cache file inside `data_dir`; the directory is created on first write
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        LocalCache {
            path: data_dir.as_ref().join(CACHE_FILE_NAME),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Ignoring corrupt cache file {}: {e}", self.path.display());
                Ok(Map::new())
            }
        }
    }

    async fn persist(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(map)?;
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Value stored under `key`; `None` if missing or of a different shape
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut map = self.load().await?;
        let Some(value) = map.remove(key) else {
            return Ok(None);
        };

        match serde_json::from_value(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!("Cached '{key}' has an unexpected shape: {e}");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.persist(&map).await?;
        debug!("Cached '{key}' in {}", self.path.display());
        Ok(())
    }

    /// Drop `key`; `false` if it was not cached
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&map).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let cache = LocalCache::new(dir.path());
        let value: Option<Vec<String>> = cache.get("tasks").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let cache = LocalCache::new(dir.path().join("nested"));

        cache.set("tasks", &vec!["a", "b"]).await.unwrap();
        cache.set("theme", "dark").await.unwrap();

        let tasks: Option<Vec<String>> = cache.get("tasks").await.unwrap();
        assert_eq!(tasks, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(!cache.path().with_extension("json.tmp").exists());

        assert!(cache.remove("tasks").await.unwrap());
        assert!(!cache.remove("tasks").await.unwrap());
        let theme: Option<String> = cache.get("theme").await.unwrap();
        assert_eq!(theme.as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = LocalCache::new(dir.path());
        std::fs::write(cache.path(), "{not json").unwrap();

        let value: Option<String> = cache.get("tasks").await.unwrap();
        assert!(value.is_none());
        cache.set("tasks", "fresh").await.unwrap();
        let value: Option<String> = cache.get("tasks").await.unwrap();
        assert_eq!(value.as_deref(), Some("fresh"));
    }
}
