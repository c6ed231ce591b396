//! Resolves the risk-policy mode for an action, and evaluates the
//! aggregate risk/approval posture of a capability scope.
//!
//! Structurally grounded on the teacher's `PolicyEngine` (a rule set
//! evaluated in priority order, producing a typed evaluation result) but
//! implements `spec.md` §4.3's own resolution algorithm rather than the
//! teacher's finance-tier guardrail logic.

mod error;
mod risk_table;

pub use error::PolicyError;
pub use risk_table::tool_risk_level;

use chrono::Utc;
use clawos_store::ClawStore;
use clawos_types::{PolicyMode, RiskLevel, RiskPolicy, ScopeSpec, WorkspaceId, WILDCARD_WORKSPACE};
use std::sync::Arc;

pub struct PolicyEngine {
    store: Arc<dyn ClawStore>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeEvaluation {
    pub blocked: bool,
    pub blocked_tool: Option<String>,
    pub approval_required: bool,
    pub risk_level: RiskLevel,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn ClawStore>) -> Self {
        Self { store }
    }

    /// Seeds the four baked-in defaults a fresh kernel ships with. Called
    /// once at startup if no rows exist yet.
    pub async fn seed_defaults_if_absent(&self) -> Result<(), PolicyError> {
        let existing = self.store.list_risk_policies().await?;
        if !existing.is_empty() {
            return Ok(());
        }
        let defaults = [
            ("web_search", PolicyMode::Auto),
            ("run_shell", PolicyMode::Ask),
            ("send_email", PolicyMode::Ask),
            ("delete_file", PolicyMode::Block),
        ];
        for (action_type, mode) in defaults {
            self.store
                .upsert_risk_policy(RiskPolicy {
                    action_type: action_type.to_string(),
                    workspace_id: WILDCARD_WORKSPACE.into(),
                    mode,
                    updated_at: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    /// Resolution order: (1) exact `(action_type, workspace)` row;
    /// (2) `(action_type, '*')`; (3) `static_default`, which the caller
    /// derives from whether the handler writes (auto for non-writing,
    /// ask for writing) since that classification lives in the handler
    /// registry, not here.
    pub async fn resolve_mode(
        &self,
        action_type: &str,
        workspace_id: &WorkspaceId,
        static_default: PolicyMode,
    ) -> Result<PolicyMode, PolicyError> {
        if let Some(row) = self
            .store
            .get_risk_policy(action_type, workspace_id.as_str())
            .await?
        {
            return Ok(row.mode);
        }
        if let Some(row) = self
            .store
            .get_risk_policy(action_type, WILDCARD_WORKSPACE)
            .await?
        {
            return Ok(row.mode);
        }
        Ok(static_default)
    }

    /// Evaluates the aggregate posture of a scope: any `block`-mode tool
    /// blocks the whole scope; otherwise any `ask`-mode tool requires
    /// approval with the highest risk level among the `ask` tools;
    /// otherwise the scope auto-approves at `Low`.
    pub async fn evaluate_scope(
        &self,
        scope: &ScopeSpec,
        workspace_id: &WorkspaceId,
    ) -> Result<ScopeEvaluation, PolicyError> {
        let mut approval_required = false;
        let mut risk_level = RiskLevel::Low;

        for tool in &scope.allowed_tools {
            let mode = self
                .resolve_mode(tool, workspace_id, PolicyMode::Auto)
                .await?;
            match mode {
                PolicyMode::Block => {
                    return Ok(ScopeEvaluation {
                        blocked: true,
                        blocked_tool: Some(tool.clone()),
                        approval_required: false,
                        risk_level: tool_risk_level(tool),
                    });
                }
                PolicyMode::Ask => {
                    approval_required = true;
                    risk_level = risk_level.max(tool_risk_level(tool));
                }
                PolicyMode::Auto => {}
            }
        }

        Ok(ScopeEvaluation {
            blocked: false,
            blocked_tool: None,
            approval_required,
            risk_level,
        })
    }

    pub async fn set_policy(
        &self,
        action_type: &str,
        workspace_id: &WorkspaceId,
        mode: PolicyMode,
    ) -> Result<RiskPolicy, PolicyError> {
        Ok(self
            .store
            .upsert_risk_policy(RiskPolicy {
                action_type: action_type.to_string(),
                workspace_id: workspace_id.clone(),
                mode,
                updated_at: Utc::now(),
            })
            .await?)
    }

    pub async fn list_policies(&self) -> Result<Vec<RiskPolicy>, PolicyError> {
        Ok(self.store.list_risk_policies().await?)
    }

    /// Single-row lookup for one `action_type`: workspace-specific row
    /// wins over the wildcard row, same precedence as `resolve_mode`.
    pub async fn get_policy(
        &self,
        action_type: &str,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<RiskPolicy>, PolicyError> {
        if let Some(row) = self
            .store
            .get_risk_policy(action_type, workspace_id.as_str())
            .await?
        {
            return Ok(Some(row));
        }
        Ok(self.store.get_risk_policy(action_type, WILDCARD_WORKSPACE).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawos_store::InMemoryStore;

    fn engine() -> (PolicyEngine, WorkspaceId) {
        let store: Arc<dyn ClawStore> = Arc::new(InMemoryStore::new());
        (PolicyEngine::new(store), WorkspaceId::new())
    }

    #[tokio::test]
    async fn resolves_static_default_when_no_rows_exist() {
        let (engine, workspace_id) = engine();
        let mode = engine
            .resolve_mode("unknown_action", &workspace_id, PolicyMode::Ask)
            .await
            .unwrap();
        assert_eq!(mode, PolicyMode::Ask);
    }

    #[tokio::test]
    async fn workspace_specific_row_beats_wildcard() {
        let (engine, workspace_id) = engine();
        engine
            .set_policy("run_shell", &WILDCARD_WORKSPACE.into(), PolicyMode::Ask)
            .await
            .unwrap();
        engine
            .set_policy("run_shell", &workspace_id, PolicyMode::Block)
            .await
            .unwrap();

        let mode = engine
            .resolve_mode("run_shell", &workspace_id, PolicyMode::Auto)
            .await
            .unwrap();
        assert_eq!(mode, PolicyMode::Block);
    }

    #[tokio::test]
    async fn scope_with_a_blocked_tool_is_blocked() {
        let (engine, workspace_id) = engine();
        engine
            .set_policy("delete_file", &WILDCARD_WORKSPACE.into(), PolicyMode::Block)
            .await
            .unwrap();

        let scope = ScopeSpec::new(vec!["web_search".into(), "delete_file".into()]);
        let evaluation = engine.evaluate_scope(&scope, &workspace_id).await.unwrap();
        assert!(evaluation.blocked);
        assert_eq!(evaluation.blocked_tool.as_deref(), Some("delete_file"));
    }

    #[tokio::test]
    async fn get_policy_prefers_workspace_row_over_wildcard() {
        let (engine, workspace_id) = engine();
        engine
            .set_policy("run_shell", &WILDCARD_WORKSPACE.into(), PolicyMode::Ask)
            .await
            .unwrap();
        engine
            .set_policy("run_shell", &workspace_id, PolicyMode::Block)
            .await
            .unwrap();

        let row = engine
            .get_policy("run_shell", &workspace_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.mode, PolicyMode::Block);

        assert!(engine
            .get_policy("unknown_action", &workspace_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn scope_with_an_ask_tool_requires_approval_at_its_risk_level() {
        let (engine, workspace_id) = engine();
        engine
            .set_policy("run_shell", &WILDCARD_WORKSPACE.into(), PolicyMode::Ask)
            .await
            .unwrap();

        let scope = ScopeSpec::new(vec!["run_shell".into()]);
        let evaluation = engine.evaluate_scope(&scope, &workspace_id).await.unwrap();
        assert!(evaluation.approval_required);
        assert_eq!(evaluation.risk_level, RiskLevel::High);
    }
}
