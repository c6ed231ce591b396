use crate::{ActorKind, EventId, TaskId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Append-only structured log entry, per task and global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub workspace_id: WorkspaceId,
    pub task_id: TaskId,
    pub actor_kind: ActorKind,
    pub actor_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

/// The closed set of event type names this kernel emits, kept here so
/// every producer and every test assertion draws from the same strings.
pub mod event_types {
    pub const SUBAGENT_SPAWNED: &str = "subagent.spawned";
    pub const TOKEN_ISSUED: &str = "token.issued";
    pub const WORKER_STARTED: &str = "worker.started";
    pub const WORKER_COMPLETED: &str = "worker.completed";
    pub const WORKER_FAILED: &str = "worker.failed";
    pub const TASK_SUCCEEDED: &str = "task.succeeded";
}
