use crate::{AgentId, Contract, TaskId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Blocked,
    NeedsApproval,
    Failed,
    Succeeded,
}

/// Contract-first unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub workspace_id: WorkspaceId,
    pub created_by_agent_id: AgentId,
    pub title: String,
    pub intent: String,
    pub contract: Contract,
    pub plan: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
