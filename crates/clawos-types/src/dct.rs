use crate::{AgentId, ScopeSpec, SubagentId, TaskId, TokenId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Agent,
    Subagent,
}

/// A Delegation Capability Token. Bearer wire form is
/// `"<token_id>.<base64url-hmac>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dct {
    pub token_id: TokenId,
    pub workspace_id: WorkspaceId,
    pub issued_to_kind: PrincipalKind,
    pub issued_to_id: String,
    pub parent_agent_id: Option<AgentId>,
    pub task_id: Option<TaskId>,
    pub scope: ScopeSpec,
    pub ttl_seconds: u64,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl Dct {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Convenience accessor for the subagent this token was minted for,
    /// when `issued_to_kind == Subagent`.
    pub fn issued_to_subagent(&self) -> Option<SubagentId> {
        match self.issued_to_kind {
            PrincipalKind::Subagent => Some(SubagentId::from_string(self.issued_to_id.clone())),
            PrincipalKind::Agent => None,
        }
    }
}
