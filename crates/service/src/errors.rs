use models::{errors::ModelError, CollectionType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing bin mapping or credentials. The only error that crosses the client boundary.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("local cache error: {0}")]
    Cache(String),
    /// The last load did not produce a usable collection, so there is nothing safe to modify.
    #[error("{0} collection is not loaded; refresh it before making changes")]
    NotLoaded(CollectionType),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl StoreError {
    pub fn missing_bin(kind: CollectionType) -> Self {
        Self::Configuration(format!("no bin id configured for collection type: {kind}"))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
