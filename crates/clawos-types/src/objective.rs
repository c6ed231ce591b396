use crate::{ObjectiveId, RequiredDeliverable, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveObjective {
    pub objective_id: ObjectiveId,
    pub session_id: SessionId,
    pub goal: String,
    pub required_deliverable: RequiredDeliverable,
    pub status: ObjectiveStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tool_evidence: Vec<ToolEvidence>,
    #[serde(default)]
    pub turns: Vec<ObjectiveTurn>,
}

/// Recorded on every real tool call; used to gate "tool-truth" claim
/// sanitization before surfacing output to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvidence {
    pub tool_name: String,
    pub called_at: DateTime<Utc>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveTurn {
    pub at: DateTime<Utc>,
    pub role: String,
    pub content: Value,
}
