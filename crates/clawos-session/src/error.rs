use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session_not_found")]
    SessionNotFound,
    #[error("objective_not_found")]
    ObjectiveNotFound,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
