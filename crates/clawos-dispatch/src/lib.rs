//! Idempotent action submission pipeline (`spec.md` §4.5): validate the
//! workspace, de-duplicate on `request_id`, gate on policy, gate on
//! approval, dispatch to a statically registered handler, persist the
//! result.
//!
//! Grounded on `palm-daemon`'s REST handler flow (validate → gate →
//! execute → persist → respond) but collapsed into one service function
//! so the kernel binary's HTTP handler stays a thin adapter.

mod error;
mod registry;

pub use error::DispatchError;
pub use registry::{ActionHandler, DispatchContext, HandlerMetadata, HandlerRegistry};

use chrono::Utc;
use clawos_approvals::ApprovalService;
use clawos_policy::PolicyEngine;
use clawos_store::ClawStore;
use clawos_types::{
    ActionRequest, ActionRequestId, ActionRequestStatus, AgentId, ApprovalId, PolicyMode,
    WorkspaceId,
};
use serde_json::Value;
use std::sync::Arc;

/// What `submit` leaves the caller to report back over HTTP. Every
/// variant but `Completed` still carries the persisted row.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Completed(ActionRequest),
    Failed(ActionRequest),
    Blocked(ActionRequest),
    ApprovalRequired {
        action_request: ActionRequest,
        approval_id: ApprovalId,
    },
}

pub struct DispatchService {
    store: Arc<dyn ClawStore>,
    policy: Arc<PolicyEngine>,
    approvals: Arc<ApprovalService>,
    registry: HandlerRegistry,
}

impl DispatchService {
    pub fn new(
        store: Arc<dyn ClawStore>,
        policy: Arc<PolicyEngine>,
        approvals: Arc<ApprovalService>,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            store,
            policy,
            approvals,
            registry,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn submit(
        &self,
        workspace_id: WorkspaceId,
        agent_id: AgentId,
        action_type: String,
        payload: Value,
        request_id: Option<ActionRequestId>,
        approval_bearer: Option<&str>,
    ) -> Result<DispatchOutcome, DispatchError> {
        if self.store.get_workspace(&workspace_id).await?.is_none() {
            return Err(DispatchError::WorkspaceNotFound);
        }

        let request_id = request_id.unwrap_or_else(ActionRequestId::new);
        let existing = self.store.get_action_request(&request_id).await?;

        let mut action_request = match existing {
            Some(existing) if existing.payload != payload => {
                return Err(DispatchError::Conflict);
            }
            // A terminal row replays its recorded outcome untouched.
            Some(existing)
                if matches!(
                    existing.status,
                    ActionRequestStatus::Completed | ActionRequestStatus::Failed
                ) =>
            {
                return Ok(Self::outcome_for(existing));
            }
            // `ApprovalRequired`/`Pending` rows fall through so a retry
            // carrying a now-valid approval bearer can actually proceed.
            Some(existing) => existing,
            None => {
                let fresh = ActionRequest {
                    request_id: request_id.clone(),
                    workspace_id: workspace_id.clone(),
                    agent_id,
                    action_type: action_type.clone(),
                    destination: None,
                    payload,
                    status: ActionRequestStatus::Pending,
                    approval_required: false,
                    approval_id: None,
                    result: None,
                    created_at: Utc::now(),
                };
                self.store.create_action_request(fresh).await?
            }
        };

        let static_default = match self.registry.get(&action_type) {
            Some(handler) if handler.metadata().writes => PolicyMode::Ask,
            _ => PolicyMode::Auto,
        };
        let mode = self
            .policy
            .resolve_mode(&action_type, &workspace_id, static_default)
            .await?;

        if mode == PolicyMode::Block {
            action_request.status = ActionRequestStatus::Failed;
            let action_request = self.store.update_action_request(action_request).await?;
            tracing::warn!(request_id = %request_id, %action_type, "action blocked by policy");
            return Ok(DispatchOutcome::Blocked(action_request));
        }

        if mode == PolicyMode::Ask {
            let has_valid_token = match approval_bearer {
                Some(bearer) => self
                    .approvals
                    .verify_cap_token(bearer, &workspace_id, &request_id, &action_type)
                    .await
                    .is_ok(),
                None => false,
            };
            if !has_valid_token {
                let approval_id = match &action_request.approval_id {
                    Some(id) => id.clone(),
                    None => {
                        let approval = self
                            .approvals
                            .create_approval(
                                workspace_id.clone(),
                                request_id.clone(),
                                action_request.agent_id.clone(),
                                None,
                            )
                            .await?;
                        approval.approval_id
                    }
                };
                action_request.status = ActionRequestStatus::ApprovalRequired;
                action_request.approval_required = true;
                action_request.approval_id = Some(approval_id.clone());
                let action_request = self.store.update_action_request(action_request).await?;
                return Ok(DispatchOutcome::ApprovalRequired {
                    action_request,
                    approval_id,
                });
            }
        }

        let handler = match self.registry.get(&action_type) {
            Some(handler) => handler,
            None => return Err(DispatchError::UnknownAction),
        };

        let started_at = Utc::now();
        let ctx = DispatchContext { started_at };
        let outcome = handler.run(&action_request, &ctx).await;
        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();

        let action_request = match outcome {
            Ok(result) => {
                action_request.status = ActionRequestStatus::Completed;
                action_request.result = Some(result);
                let stored = self.store.update_action_request(action_request).await?;
                tracing::info!(
                    request_id = %request_id, agent_id = %stored.agent_id, %action_type,
                    status = "completed", elapsed_ms, "action dispatched"
                );
                stored
            }
            Err(reason) => {
                action_request.status = ActionRequestStatus::Failed;
                action_request.result = Some(Value::String(reason.clone()));
                let stored = self.store.update_action_request(action_request).await?;
                tracing::warn!(
                    request_id = %request_id, agent_id = %stored.agent_id, %action_type,
                    status = "failed", elapsed_ms, %reason, "action dispatched"
                );
                stored
            }
        };

        Ok(Self::outcome_for(action_request))
    }

    /// Runs a handler directly, skipping the policy and approval gates.
    /// Used for nested actions a worker handler issues under cover of its
    /// own already-verified DCT — `spec.md` §4.7 step 4's
    /// `operator.approvals`-scoped callback.
    pub async fn submit_preauthorized(
        &self,
        workspace_id: WorkspaceId,
        agent_id: AgentId,
        action_type: String,
        payload: Value,
    ) -> Result<DispatchOutcome, DispatchError> {
        let handler = self
            .registry
            .get(&action_type)
            .ok_or(DispatchError::UnknownAction)?;

        let mut action_request = ActionRequest {
            request_id: ActionRequestId::new(),
            workspace_id,
            agent_id,
            action_type,
            destination: None,
            payload,
            status: ActionRequestStatus::Pending,
            approval_required: false,
            approval_id: None,
            result: None,
            created_at: Utc::now(),
        };
        action_request = self.store.create_action_request(action_request).await?;

        let ctx = DispatchContext {
            started_at: Utc::now(),
        };
        match handler.run(&action_request, &ctx).await {
            Ok(result) => {
                action_request.status = ActionRequestStatus::Completed;
                action_request.result = Some(result);
                let stored = self.store.update_action_request(action_request).await?;
                Ok(DispatchOutcome::Completed(stored))
            }
            Err(reason) => {
                action_request.status = ActionRequestStatus::Failed;
                action_request.result = Some(Value::String(reason));
                let stored = self.store.update_action_request(action_request).await?;
                Ok(DispatchOutcome::Failed(stored))
            }
        }
    }

    fn outcome_for(action_request: ActionRequest) -> DispatchOutcome {
        match action_request.status {
            ActionRequestStatus::Completed => DispatchOutcome::Completed(action_request),
            ActionRequestStatus::Failed
            | ActionRequestStatus::ApprovalRequired
            | ActionRequestStatus::Pending => DispatchOutcome::Failed(action_request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clawos_crypto::HmacKey;
    use clawos_store::InMemoryStore;
    use clawos_types::{RiskLevel, Workspace};
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ActionHandler for EchoHandler {
        fn metadata(&self) -> HandlerMetadata {
            HandlerMetadata {
                name: "echo",
                writes: false,
                risk_level: RiskLevel::Low,
                reversible: true,
                description: "echoes the payload back",
            }
        }

        async fn run(&self, request: &ActionRequest, _ctx: &DispatchContext) -> Result<Value, String> {
            Ok(request.payload.clone())
        }
    }

    struct WritingHandler;

    #[async_trait]
    impl ActionHandler for WritingHandler {
        fn metadata(&self) -> HandlerMetadata {
            HandlerMetadata {
                name: "send_email",
                writes: true,
                risk_level: RiskLevel::Medium,
                reversible: false,
                description: "sends an email",
            }
        }

        async fn run(&self, _request: &ActionRequest, _ctx: &DispatchContext) -> Result<Value, String> {
            Ok(json!({"sent": true}))
        }
    }

    async fn seeded() -> (DispatchService, WorkspaceId) {
        let store: Arc<dyn ClawStore> = Arc::new(InMemoryStore::new());
        let workspace_id = WorkspaceId::new();
        store
            .create_workspace(Workspace {
                id: workspace_id.clone(),
                workspace_type: "default".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let policy = Arc::new(PolicyEngine::new(store.clone()));
        let approvals = Arc::new(ApprovalService::new(store.clone(), HmacKey::dev()));
        let registry = HandlerRegistry::new(vec![
            Arc::new(EchoHandler) as Arc<dyn ActionHandler>,
            Arc::new(WritingHandler) as Arc<dyn ActionHandler>,
        ]);
        (
            DispatchService::new(store, policy, approvals, registry),
            workspace_id,
        )
    }

    #[tokio::test]
    async fn auto_mode_action_completes_immediately() {
        let (service, workspace_id) = seeded().await;
        let outcome = service
            .submit(
                workspace_id,
                AgentId::from("agent-1"),
                "echo".into(),
                json!({"q": "hi"}),
                None,
                None,
            )
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let (service, workspace_id) = seeded().await;
        let err = service
            .submit(
                workspace_id,
                AgentId::from("agent-1"),
                "does_not_exist".into(),
                json!({}),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownAction));
    }

    #[tokio::test]
    async fn same_request_id_and_payload_is_idempotent() {
        let (service, workspace_id) = seeded().await;
        let request_id = ActionRequestId::new();
        let payload = json!({"q": "hi"});

        let first = service
            .submit(
                workspace_id.clone(),
                AgentId::from("agent-1"),
                "echo".into(),
                payload.clone(),
                Some(request_id.clone()),
                None,
            )
            .await
            .unwrap();
        let second = service
            .submit(
                workspace_id,
                AgentId::from("agent-1"),
                "echo".into(),
                payload,
                Some(request_id),
                None,
            )
            .await
            .unwrap();

        match (first, second) {
            (DispatchOutcome::Completed(a), DispatchOutcome::Completed(b)) => {
                assert_eq!(a.request_id, b.request_id);
            }
            other => panic!("expected two completed outcomes, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_request_id_with_different_payload_conflicts() {
        let (service, workspace_id) = seeded().await;
        let request_id = ActionRequestId::new();
        service
            .submit(
                workspace_id.clone(),
                AgentId::from("agent-1"),
                "echo".into(),
                json!({"q": "a"}),
                Some(request_id.clone()),
                None,
            )
            .await
            .unwrap();

        let err = service
            .submit(
                workspace_id,
                AgentId::from("agent-1"),
                "echo".into(),
                json!({"q": "b"}),
                Some(request_id),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict));
    }

    #[tokio::test]
    async fn writing_action_without_token_requires_approval() {
        let (service, workspace_id) = seeded().await;
        let outcome = service
            .submit(
                workspace_id,
                AgentId::from("agent-1"),
                "send_email".into(),
                json!({"to": "a@example.com"}),
                None,
                None,
            )
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::ApprovalRequired { .. }));
    }
}
