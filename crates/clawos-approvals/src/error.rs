use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval_not_found")]
    ApprovalNotFound,
    #[error("dct_approval_not_found")]
    DarNotFound,
    #[error("already_decided")]
    AlreadyDecided,
    #[error("dct_approval_expired")]
    DarExpired,
    #[error("dct_approval_denied")]
    DarDenied,
    #[error("approval_workspace_id_mismatch")]
    WorkspaceMismatch,
    #[error("approval_action_request_id_mismatch")]
    ActionRequestMismatch,
    #[error("invalid_or_expired_token")]
    BadCapToken,
    #[error("ttl extension may only be applied to a still-pending decision")]
    NotExtendable,
    #[error("requested ttl exceeds the maximum of {max}s")]
    TtlTooLarge { max: u64 },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
