use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

/// Key-value persistence for collection snapshots.
/// Implementations can be file-backed or purely in-memory.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Last value written under `key`, if any.
    async fn read(&self, key: &str) -> Option<Value>;
    /// Replace the value under `key` and persist.
    async fn write(&self, key: &str, value: Value) -> Result<(), StoreError>;
}
