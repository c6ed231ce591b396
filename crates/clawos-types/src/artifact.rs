use crate::{ArtifactId, TaskId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Agent,
    Subagent,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: ArtifactId,
    pub task_id: TaskId,
    pub workspace_id: WorkspaceId,
    pub actor_kind: ActorKind,
    pub actor_id: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub content: Option<Value>,
    pub uri: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}
