use clawos_identity::IdentityError;
use clawos_store::StorageError;
use clawos_tokens::TokenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid_or_expired_token")]
    BadToken,
    #[error("token_not_bound_to_this_subagent")]
    TokenNotBoundToSubagent,
    #[error("subagent_already_{0}")]
    AlreadyTerminal(&'static str),
    #[error("handler_failed: {0}")]
    HandlerFailed(String),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
