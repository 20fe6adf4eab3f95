//! Remote JSON document store holding one collection per bin.

pub mod jsonbin;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

pub use jsonbin::JsonBinClient;

/// Whole-document access to a remote bin. No partial updates, no pagination.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Latest document stored in `bin_id`; `Value::Null` when the bin holds nothing.
    async fn fetch(&self, bin_id: &str) -> Result<Value, StoreError>;
    /// Replace the document stored in `bin_id`.
    async fn replace(&self, bin_id: &str, document: &Value) -> Result<(), StoreError>;
}
