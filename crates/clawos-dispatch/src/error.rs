use clawos_approvals::ApprovalError;
use clawos_policy::PolicyError;
use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("workspace_not_found")]
    WorkspaceNotFound,
    #[error("request_id_conflict")]
    Conflict,
    #[error("blocked")]
    Blocked,
    #[error("unknown_action")]
    UnknownAction,
    #[error("handler_failed: {0}")]
    HandlerFailed(String),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("approval error: {0}")]
    Approval(#[from] ApprovalError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
