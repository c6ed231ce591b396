//! Executes one subagent run under a verified DCT (`spec.md` §4.7):
//! assert liveness, flip to running, dispatch to a worker handler,
//! persist the result as an artifact, emit lifecycle events.
//!
//! Grounded on `aas-ledger`'s verify-then-transition pattern, generalized
//! to a three-state subagent lifecycle with an artifact side effect
//! instead of a ledger commitment.

mod error;
mod registry;

pub use error::WorkerError;
pub use registry::{EchoWorkerHandler, WorkerContext, WorkerHandler, WorkerHandlerRegistry};

use chrono::Utc;
use clawos_dispatch::DispatchService;
use clawos_identity::IdentityService;
use clawos_store::ClawStore;
use clawos_tokens::TokenService;
use clawos_types::{
    event_types, ActorKind, Artifact, ArtifactId, Event, EventId, PrincipalKind, SubagentId,
    SubagentStatus,
};
use serde_json::Value;
use std::sync::Arc;

pub struct WorkerService {
    store: Arc<dyn ClawStore>,
    identity: Arc<IdentityService>,
    tokens: Arc<TokenService>,
    registry: WorkerHandlerRegistry,
}

impl WorkerService {
    pub fn new(
        store: Arc<dyn ClawStore>,
        identity: Arc<IdentityService>,
        tokens: Arc<TokenService>,
        registry: WorkerHandlerRegistry,
    ) -> Self {
        Self {
            store,
            identity,
            tokens,
            registry,
        }
    }

    pub async fn run_subagent(
        &self,
        subagent_id: &SubagentId,
        dct_bearer: &str,
        input: Value,
        dispatch: Arc<DispatchService>,
    ) -> Result<Artifact, WorkerError> {
        let dct = self
            .tokens
            .verify_dct(dct_bearer)
            .await
            .map_err(|_| WorkerError::BadToken)?;

        if dct.issued_to_kind != PrincipalKind::Subagent
            || dct.issued_to_id != subagent_id.as_str()
        {
            return Err(WorkerError::TokenNotBoundToSubagent);
        }

        let subagent = self
            .identity
            .assert_subagent(subagent_id, &dct.workspace_id)
            .await?;

        match subagent.status {
            SubagentStatus::Created | SubagentStatus::Running => {}
            SubagentStatus::Finished => return Err(WorkerError::AlreadyTerminal("finished")),
            SubagentStatus::Failed => return Err(WorkerError::AlreadyTerminal("failed")),
        }

        self.identity
            .update_subagent_status(subagent_id, SubagentStatus::Running)
            .await?;
        self.append_event(
            &subagent,
            event_types::WORKER_STARTED,
            Value::Null,
        )
        .await?;

        let handler = self.registry.resolve(&subagent.worker_type);
        let ctx = WorkerContext {
            subagent: subagent.clone(),
            dct: dct.clone(),
            dispatch,
        };

        match handler.run(input, &ctx).await {
            Ok(result) => {
                let artifact = Artifact {
                    artifact_id: ArtifactId::new(),
                    task_id: subagent.task_id.clone(),
                    workspace_id: subagent.workspace_id.clone(),
                    actor_kind: ActorKind::Subagent,
                    actor_id: subagent.subagent_id.to_string(),
                    artifact_type: "worker_result".into(),
                    content: Some(result),
                    uri: None,
                    metadata: Value::Null,
                    created_at: Utc::now(),
                };
                let artifact = self.store.create_artifact(artifact).await?;
                self.append_event(
                    &subagent,
                    event_types::WORKER_COMPLETED,
                    serde_json::json!({ "artifact_id": artifact.artifact_id }),
                )
                .await?;
                self.identity
                    .update_subagent_status(subagent_id, SubagentStatus::Finished)
                    .await?;
                Ok(artifact)
            }
            Err(reason) => {
                self.append_event(
                    &subagent,
                    event_types::WORKER_FAILED,
                    serde_json::json!({ "reason": reason }),
                )
                .await?;
                self.identity
                    .update_subagent_status(subagent_id, SubagentStatus::Failed)
                    .await?;
                Err(WorkerError::HandlerFailed(reason))
            }
        }
    }

    async fn append_event(
        &self,
        subagent: &clawos_types::Subagent,
        event_type: &str,
        data: Value,
    ) -> Result<(), WorkerError> {
        self.store
            .append_event(Event {
                event_id: EventId::new(),
                workspace_id: subagent.workspace_id.clone(),
                task_id: subagent.task_id.clone(),
                actor_kind: ActorKind::Subagent,
                actor_id: subagent.subagent_id.to_string(),
                event_type: event_type.to_string(),
                ts: Utc::now(),
                data,
            })
            .await?;
        Ok(())
    }
}
