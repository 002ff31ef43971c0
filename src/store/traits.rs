use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Key/value pairs as exchanged with a [`KeyValueStore`].
pub type StoreMap = Map<String, Value>;

/// Shared persistent key-value store.
///
/// Implementations may enforce their own write-rate limit; callers that write
/// frequently go through [`WriteCoalescer`](super::WriteCoalescer) instead of
/// calling [`set`](Self::set) directly.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Values for the requested keys; absent keys are simply missing from the map.
    async fn get(&self, keys: &[&str]) -> Result<StoreMap, StoreError>;

    /// Write every entry in one operation.
    async fn set(&self, entries: StoreMap) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    /// Every stored entry.
    async fn snapshot(&self) -> Result<StoreMap, StoreError>;
}
