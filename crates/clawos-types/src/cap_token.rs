use crate::{ActionRequestId, TokenId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The action-level bearer token minted after an approval decision,
/// bound to exactly one `(workspace, action_request_id, tool_name)`
/// triple (`spec.md` §4.6). Distinct from a `Dct`: a cap token authorizes
/// a single retry of one already-decided action request, never a whole
/// scope of tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapToken {
    pub token_id: TokenId,
    pub workspace_id: WorkspaceId,
    pub action_request_id: ActionRequestId,
    pub tool_name: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CapToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
