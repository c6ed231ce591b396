use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
