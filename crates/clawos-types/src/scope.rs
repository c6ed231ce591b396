use serde::{Deserialize, Serialize};

/// `{ allowed_tools, operations, resource_constraints }` — the contract a
/// token authorizes, or a task's capability envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScopeSpec {
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub resource_constraints: ResourceConstraints,
}

impl ScopeSpec {
    pub fn new(allowed_tools: Vec<String>) -> Self {
        Self {
            allowed_tools,
            operations: Vec::new(),
            resource_constraints: ResourceConstraints::default(),
        }
    }

    /// True when every tool in `self` is also present in `parent`, i.e.
    /// `self` does not exceed `parent`'s authority.
    pub fn is_subset_of(&self, parent: &ScopeSpec) -> bool {
        self.allowed_tools
            .iter()
            .all(|tool| parent.allowed_tools.iter().any(|t| t == tool))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceConstraints {
    #[serde(default)]
    pub max_calls: Option<u32>,
    #[serde(default)]
    pub max_bytes: Option<u64>,
}
