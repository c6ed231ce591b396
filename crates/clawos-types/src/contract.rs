use crate::ScopeSpec;
use serde::{Deserialize, Serialize};

/// `contract = { objective, scope, deliverables[], acceptance_checks[] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub objective: String,
    #[serde(default)]
    pub scope: ScopeSpec,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub acceptance_checks: Vec<AcceptanceCheck>,
}

/// Discriminated union of the acceptance checks a task can carry. New
/// variants require a code change, matching the "tagged records, not
/// untyped JSON" redesign note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum AcceptanceCheck {
    MinArtifacts { count: u32 },
    SubagentsFinished,
}

/// `{ type, count?, description, item_format? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredDeliverable {
    #[serde(rename = "type")]
    pub deliverable_type: DeliverableType,
    pub count: Option<u32>,
    pub description: String,
    pub item_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableType {
    List,
    Answer,
    Code,
    File,
    None,
}
