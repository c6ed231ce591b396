use crate::{ActionRequestId, AgentId, ApprovalId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// An action-level approval, tied to exactly one action request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub approval_id: ApprovalId,
    pub workspace_id: WorkspaceId,
    pub action_request_id: ActionRequestId,
    pub requested_by: AgentId,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub decision_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Expired pending approvals read as denied without a status write.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ApprovalStatus {
        if self.status == ApprovalStatus::Pending && self.is_expired(now) {
            ApprovalStatus::Rejected
        } else {
            self.status
        }
    }
}
