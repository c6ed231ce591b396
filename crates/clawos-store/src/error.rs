use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("row not found")]
    NotFound,
    #[error("row already exists")]
    AlreadyExists,
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("failed to (de)serialize stored record: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Codec(e.to_string())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}
