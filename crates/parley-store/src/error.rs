use std::path::PathBuf;

use parley_types::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid task ID: {0:?}")]
    InvalidTaskId(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error at {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for ProtocolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTaskId(id) => {
                ProtocolError::invalid_params(format!("Invalid task ID: {id}"))
            }
            other => ProtocolError::internal_error("Task store failure")
                .with_data(serde_json::Value::String(other.to_string())),
        }
    }
}
