use clawos_identity::IdentityError;
use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task_not_found")]
    TaskNotFound,
    #[error("workspace_mismatch")]
    WorkspaceMismatch,
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
