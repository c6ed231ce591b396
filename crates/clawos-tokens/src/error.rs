use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("subagent-kind tokens must carry a parent_agent_id")]
    MissingParentForSubagent,
    #[error("scope_blocked_by_policy")]
    ScopeExceedsParentAuthority,
    #[error("scope_blocked_by_policy")]
    MissingParentAuthority,
    #[error("bad_token")]
    BadFormat,
    #[error("invalid_or_expired_token")]
    InvalidSignature,
    #[error("invalid_or_expired_token")]
    NotFound,
    #[error("invalid_or_expired_token")]
    Revoked,
    #[error("invalid_or_expired_token")]
    Expired,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
