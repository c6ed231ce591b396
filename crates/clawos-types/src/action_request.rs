use crate::{ActionRequestId, AgentId, ApprovalId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequestStatus {
    Pending,
    Completed,
    ApprovalRequired,
    Failed,
}

/// A single user-facing invocation of an action handler, identified by
/// `request_id` for idempotency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub request_id: ActionRequestId,
    pub workspace_id: WorkspaceId,
    pub agent_id: AgentId,
    pub action_type: String,
    pub destination: Option<String>,
    pub payload: Value,
    pub status: ActionRequestStatus,
    pub approval_required: bool,
    /// Set once an approval row is created for this request, so a retry
    /// on the same `request_id` can report the existing approval rather
    /// than minting a duplicate one.
    #[serde(default)]
    pub approval_id: Option<ApprovalId>,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
}
