use crate::{AgentId, DarId, PrincipalKind, ScopeSpec, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DarStatus {
    Pending,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn max(self, other: RiskLevel) -> RiskLevel {
        use RiskLevel::*;
        match (self, other) {
            (High, _) | (_, High) => High,
            (Medium, _) | (_, Medium) => Medium,
            _ => Low,
        }
    }
}

/// A pending human-in-the-loop decision required before a DCT is minted.
/// Only agents may request one; subagents cannot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DctApprovalRequest {
    pub dar_id: DarId,
    pub workspace_id: WorkspaceId,
    pub requested_by_agent_id: AgentId,
    pub issue_to_kind: PrincipalKind,
    pub issue_to_id: String,
    pub scope: ScopeSpec,
    pub ttl_seconds: u64,
    pub risk_level: RiskLevel,
    pub status: DarStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl DctApprovalRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
