use super::traits::{KeyValueStore, StoreMap};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

struct Inner {
    entries: StoreMap,
    last_write: Option<Instant>,
}

/// In-process store, optionally enforcing a minimum interval between writes
/// the way browser sync storage does.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    write_limit: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: StoreMap::new(),
                last_write: None,
            }),
            write_limit: None,
        }
    }

    /// Reject writes that arrive less than `interval` after the previous one.
    pub fn with_write_limit(mut self, interval: Duration) -> Self {
        self.write_limit = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn with_entries(self, entries: StoreMap) -> Self {
        self.lock().entries = entries;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_rate(&self, inner: &Inner) -> Result<(), StoreError> {
        let (Some(limit), Some(last)) = (self.write_limit, inner.last_write) else {
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
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError> {
        let inner = self.lock();
        Ok(keys
            .iter()
            .filter_map(|key| {
                inner
                    .entries
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect())
    }

    async fn set(&self, entries: StoreMap) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.check_rate(&inner)?;
        inner.entries.extend(entries);
        inner.last_write = Some(Instant::now());
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for key in keys {
            inner.entries.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.lock().entries.clear();
        Ok(())
    }

    async fn snapshot(&self) -> Result<StoreMap, StoreError> {
        Ok(self.lock().entries.clone())
    }
}
