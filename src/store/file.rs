use super::traits::{KeyValueStore, StoreMap};
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Store persisted as one pretty-printed JSON object on disk.
///
/// The whole map is cached in memory; every mutation rewrites the file
/// through a sibling temp file and a rename, and the cache only changes once
/// the rename succeeded.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<StoreMap>,
    write_limit: Option<Duration>,
    last_write: std::sync::Mutex<Option<Instant>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => StoreMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreMap::new(),
            Err(e) => return Err(StoreError::Read(format!("{}: {e}", path.display()))),
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened JSON store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            write_limit: None,
            last_write: std::sync::Mutex::new(None),
        })
    }

    /// Reject `set` calls that arrive less than `interval` after the last
    /// successful one. A zero interval disables the check.
    pub fn with_write_limit(mut self, interval: Duration) -> Self {
        self.write_limit = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_rate(&self) -> Result<(), StoreError> {
        let last = *self.last_write.lock().unwrap_or_else(|e| e.into_inner());
        let (Some(limit), Some(last)) = (self.write_limit, last) else {
            return Ok(());
        };
        let elapsed = last.elapsed();
        if elapsed < limit {
            #[allow(clippy::cast_possible_truncation)]
            let retry_after_ms = (limit - elapsed).as_millis() as u64;
            return Err(StoreError::RateLimited { retry_after_ms });
        }
        Ok(())
    }

    async fn persist(&self, entries: &StoreMap) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Write(format!("{}: {e}", parent.display())))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", self.path.display())))
    }

    async fn mutate(&self, apply: impl FnOnce(&mut StoreMap)) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().await;
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| {
                entries
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect())
    }

    async fn set(&self, entries: StoreMap) -> Result<(), StoreError> {
        self.check_rate()?;
        self.mutate(|map| map.extend(entries)).await?;
        *self.last_write.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.mutate(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
        .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.mutate(StoreMap::clear).await
    }

    async fn snapshot(&self) -> Result<StoreMap, StoreError> {
        Ok(self.entries.lock().await.clone())
    }
}
