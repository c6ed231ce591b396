//! Maps every service crate's error enum onto the kebab-case error
//! vocabulary (`spec.md` §7) and an HTTP status. The `ms` field the spec
//! error body carries is not set here — it is stamped onto every
//! response, success or failure, by the `inject_elapsed_ms` middleware so
//! handlers never have to thread a timer through.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad_request")]
    BadRequest(String),
    #[error("missing_field")]
    MissingField(&'static str),

    #[error("workspace_not_found")]
    WorkspaceNotFound,
    #[error("agent_not_found")]
    AgentNotFound,
    #[error("task_not_found")]
    TaskNotFound,
    #[error("subagent_not_found")]
    SubagentNotFound,
    #[error("approval_not_found")]
    ApprovalNotFound,
    #[error("dct_approval_not_found")]
    DarNotFound,
    #[error("session_not_found")]
    SessionNotFound,
    #[error("objective_not_found")]
    ObjectiveNotFound,
    #[error("connection_not_found")]
    ConnectionNotFound,
    #[error("risk_policy_not_found")]
    RiskPolicyNotFound,

    #[error("kernel_locked")]
    KernelLocked,
    #[error("workspace_mismatch")]
    WorkspaceMismatch,
    #[error("agent_workspace_mismatch")]
    AgentWorkspaceMismatch,
    #[error("subagent_not_owned_by_requesting_agent")]
    SubagentNotOwned,
    #[error("agents_may_only_request_tokens_for_themselves_v1")]
    AgentsMayOnlyRequestTokensForThemselves,
    #[error("approval_workspace_id_mismatch")]
    ApprovalWorkspaceMismatch,
    #[error("approval_action_request_id_mismatch")]
    ApprovalActionRequestMismatch,
    #[error("token_not_bound_to_this_subagent")]
    TokenNotBoundToSubagent,
    #[error("invalid_or_expired_token")]
    InvalidOrExpiredToken,
    #[error("bad_token")]
    BadToken,

    #[error("conflict")]
    Conflict,
    #[error("subagent_already_{0}")]
    SubagentAlreadyTerminal(&'static str),
    #[error("already_decided")]
    AlreadyDecided,
    #[error("ttl extension is only valid on a still-pending decision")]
    NotExtendable,

    #[error("scope_blocked_by_policy")]
    ScopeBlockedByPolicy,
    #[error("blocked")]
    Blocked,
    #[error("dct_approval_expired")]
    DarExpired,
    #[error("dct_approval_denied")]
    DarDenied,

    #[error("unknown_action")]
    UnknownAction,
    #[error("{0}")]
    HandlerFailed(String),
    #[error("decrypt_failed")]
    DecryptFailed,

    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        use ApiError::*;
        match self {
            BadRequest(_) | MissingField(_) | UnknownAction => StatusCode::BAD_REQUEST,
            WorkspaceNotFound | AgentNotFound | TaskNotFound | SubagentNotFound
            | ApprovalNotFound | DarNotFound | SessionNotFound | ObjectiveNotFound
            | ConnectionNotFound | RiskPolicyNotFound => StatusCode::NOT_FOUND,
            KernelLocked
            | WorkspaceMismatch
            | AgentWorkspaceMismatch
            | SubagentNotOwned
            | AgentsMayOnlyRequestTokensForThemselves
            | ApprovalWorkspaceMismatch
            | ApprovalActionRequestMismatch
            | TokenNotBoundToSubagent
            | InvalidOrExpiredToken
            | BadToken => StatusCode::FORBIDDEN,
            Conflict | SubagentAlreadyTerminal(_) | AlreadyDecided | NotExtendable => {
                StatusCode::CONFLICT
            }
            ScopeBlockedByPolicy | Blocked | DarExpired | DarDenied => StatusCode::FORBIDDEN,
            HandlerFailed(_) | DecryptFailed | Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<clawos_store::StorageError> for ApiError {
    fn from(e: clawos_store::StorageError) -> Self {
        ApiError::Storage(e.to_string())
    }
}

impl From<clawos_crypto::CryptoError> for ApiError {
    fn from(e: clawos_crypto::CryptoError) -> Self {
        use clawos_crypto::CryptoError::*;
        match e {
            DecryptFailed => ApiError::DecryptFailed,
            InvalidSignature => ApiError::InvalidOrExpiredToken,
            InvalidMasterKey | EncryptFailed | Serialize => ApiError::Storage(e.to_string()),
        }
    }
}

impl From<clawos_identity::IdentityError> for ApiError {
    fn from(e: clawos_identity::IdentityError) -> Self {
        use clawos_identity::IdentityError::*;
        match e {
            AgentNotFound => ApiError::AgentNotFound,
            WorkspaceNotFound => ApiError::WorkspaceNotFound,
            WorkspaceMismatch => ApiError::AgentWorkspaceMismatch,
            TaskNotFound => ApiError::TaskNotFound,
            SubagentNotFound => ApiError::SubagentNotFound,
            MissingAgentOrTaskBinding => ApiError::BadRequest(e.to_string()),
            Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_policy::PolicyError> for ApiError {
    fn from(e: clawos_policy::PolicyError) -> Self {
        match e {
            clawos_policy::PolicyError::Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_tokens::TokenError> for ApiError {
    fn from(e: clawos_tokens::TokenError) -> Self {
        use clawos_tokens::TokenError::*;
        match e {
            MissingParentForSubagent => ApiError::BadRequest(e.to_string()),
            ScopeExceedsParentAuthority | MissingParentAuthority => ApiError::ScopeBlockedByPolicy,
            BadFormat => ApiError::BadToken,
            InvalidSignature | NotFound | Revoked | Expired => ApiError::InvalidOrExpiredToken,
            Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_approvals::ApprovalError> for ApiError {
    fn from(e: clawos_approvals::ApprovalError) -> Self {
        use clawos_approvals::ApprovalError::*;
        match e {
            ApprovalNotFound => ApiError::ApprovalNotFound,
            DarNotFound => ApiError::DarNotFound,
            AlreadyDecided => ApiError::AlreadyDecided,
            DarExpired => ApiError::DarExpired,
            DarDenied => ApiError::DarDenied,
            WorkspaceMismatch => ApiError::ApprovalWorkspaceMismatch,
            ActionRequestMismatch => ApiError::ApprovalActionRequestMismatch,
            BadCapToken => ApiError::InvalidOrExpiredToken,
            NotExtendable => ApiError::NotExtendable,
            TtlTooLarge { .. } => ApiError::BadRequest(e.to_string()),
            Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_dispatch::DispatchError> for ApiError {
    fn from(e: clawos_dispatch::DispatchError) -> Self {
        use clawos_dispatch::DispatchError::*;
        match e {
            WorkspaceNotFound => ApiError::WorkspaceNotFound,
            Conflict => ApiError::Conflict,
            Blocked => ApiError::Blocked,
            UnknownAction => ApiError::UnknownAction,
            HandlerFailed(msg) => ApiError::HandlerFailed(msg),
            Policy(inner) => inner.into(),
            Approval(inner) => inner.into(),
            Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_worker::WorkerError> for ApiError {
    fn from(e: clawos_worker::WorkerError) -> Self {
        use clawos_worker::WorkerError::*;
        match e {
            BadToken => ApiError::InvalidOrExpiredToken,
            TokenNotBoundToSubagent => ApiError::TokenNotBoundToSubagent,
            AlreadyTerminal(status) => ApiError::SubagentAlreadyTerminal(status),
            HandlerFailed(msg) => ApiError::HandlerFailed(msg),
            Identity(inner) => inner.into(),
            Token(inner) => inner.into(),
            Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_tasks::TaskError> for ApiError {
    fn from(e: clawos_tasks::TaskError) -> Self {
        use clawos_tasks::TaskError::*;
        match e {
            TaskNotFound => ApiError::TaskNotFound,
            WorkspaceMismatch => ApiError::WorkspaceMismatch,
            Identity(inner) => inner.into(),
            Storage(inner) => inner.into(),
        }
    }
}

impl From<clawos_session::SessionError> for ApiError {
    fn from(e: clawos_session::SessionError) -> Self {
        use clawos_session::SessionError::*;
        match e {
            SessionNotFound => ApiError::SessionNotFound,
            ObjectiveNotFound => ApiError::ObjectiveNotFound,
            Storage(inner) => inner.into(),
        }
    }
}
