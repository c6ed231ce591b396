use crate::{AgentId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable, externally-named identity. Only agents may create tasks,
/// request tokens, and grant approvals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub workspace_id: WorkspaceId,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
