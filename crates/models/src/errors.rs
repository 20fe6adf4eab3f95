use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown collection type: {0}")]
    UnknownCollection(String),
    #[error("record is not a JSON object: {0}")]
    NotAnObject(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
