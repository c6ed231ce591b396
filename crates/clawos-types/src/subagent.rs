use crate::{AgentId, SubagentId, TaskId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubagentStatus {
    Created,
    Running,
    Finished,
    Failed,
}

impl SubagentStatus {
    /// Transitions are monotonic: `created -> running -> finished|failed`,
    /// with no replay from either terminal state.
    pub fn can_transition_to(self, next: SubagentStatus) -> bool {
        use SubagentStatus::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Finished)
                | (Created, Failed)
                | (Running, Finished)
                | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubagentStatus::Finished | SubagentStatus::Failed)
    }
}

/// Ephemeral worker bound to exactly one parent agent and one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subagent {
    pub subagent_id: SubagentId,
    pub parent_agent_id: AgentId,
    pub workspace_id: WorkspaceId,
    pub task_id: TaskId,
    pub step_id: Option<String>,
    pub worker_type: String,
    pub status: SubagentStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
