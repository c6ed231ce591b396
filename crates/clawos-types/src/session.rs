use crate::{SessionId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Closed,
}

/// Maximum length of `context_summary`, enforced wherever it is written.
pub const CONTEXT_SUMMARY_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub workspace_id: WorkspaceId,
    pub channel: String,
    pub remote_jid: String,
    pub status: SessionStatus,
    pub turn_count: u32,
    pub context_summary: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

/// Why `sessions/resolve` returned the session it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionResolveReason {
    ExplicitReset,
    NoSession,
    SessionClosed,
    Timeout,
    TopicDrift,
    Continue,
}

impl SessionResolveReason {
    /// Every reason except `Continue` creates a fresh session row.
    pub fn creates_new_session(self) -> bool {
        !matches!(self, SessionResolveReason::Continue)
    }
}
