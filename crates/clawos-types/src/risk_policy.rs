use crate::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wildcard workspace id for a policy row that applies to every workspace.
pub const WILDCARD_WORKSPACE: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    Auto,
    Ask,
    Block,
}

/// `{ action_type, workspace_id ('*' = wildcard), mode, updated_at }`.
/// A workspace-specific row beats a wildcard row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub action_type: String,
    pub workspace_id: WorkspaceId,
    pub mode: PolicyMode,
    pub updated_at: DateTime<Utc>,
}
