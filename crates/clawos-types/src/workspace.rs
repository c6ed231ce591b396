use crate::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    #[serde(rename = "type")]
    pub workspace_type: String,
    pub created_at: DateTime<Utc>,
}
