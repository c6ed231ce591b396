//! Per-concern storage traits, unified into one [`ClawStore`] object-safe
//! facade via a blanket implementation — the same shape as the teacher's
//! `MapleStorage` over its per-concern commitment/audit/checkpoint traits.

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clawos_types::*;

pub type StoreResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn create_workspace(&self, workspace: Workspace) -> StoreResult<Workspace>;
    async fn get_workspace(&self, id: &WorkspaceId) -> StoreResult<Option<Workspace>>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn upsert_agent(&self, agent: Agent) -> StoreResult<Agent>;
    async fn get_agent(&self, id: &AgentId) -> StoreResult<Option<Agent>>;
    async fn insert_subagent(&self, subagent: Subagent) -> StoreResult<Subagent>;
    async fn get_subagent(&self, id: &SubagentId) -> StoreResult<Option<Subagent>>;
    async fn update_subagent(&self, subagent: Subagent) -> StoreResult<Subagent>;
    async fn list_subagents_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Subagent>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: Task) -> StoreResult<Task>;
    async fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>>;
    async fn update_task(&self, task: Task) -> StoreResult<Task>;
    async fn create_artifact(&self, artifact: Artifact) -> StoreResult<Artifact>;
    async fn list_artifacts_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Artifact>>;
    async fn append_event(&self, event: Event) -> StoreResult<Event>;
    async fn list_events_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Event>>;
}

#[async_trait]
pub trait ActionRequestStore: Send + Sync {
    async fn create_action_request(&self, request: ActionRequest) -> StoreResult<ActionRequest>;
    async fn get_action_request(
        &self,
        id: &ActionRequestId,
    ) -> StoreResult<Option<ActionRequest>>;
    async fn update_action_request(&self, request: ActionRequest) -> StoreResult<ActionRequest>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_dct(&self, dct: Dct) -> StoreResult<Dct>;
    async fn get_dct(&self, id: &TokenId) -> StoreResult<Option<Dct>>;
    async fn update_dct(&self, dct: Dct) -> StoreResult<Dct>;
    async fn delete_expired_dcts(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn create_approval(&self, approval: Approval) -> StoreResult<Approval>;
    async fn get_approval(&self, id: &ApprovalId) -> StoreResult<Option<Approval>>;
    async fn update_approval(&self, approval: Approval) -> StoreResult<Approval>;
    async fn create_dar(&self, dar: DctApprovalRequest) -> StoreResult<DctApprovalRequest>;
    async fn get_dar(&self, id: &DarId) -> StoreResult<Option<DctApprovalRequest>>;
    async fn update_dar(&self, dar: DctApprovalRequest) -> StoreResult<DctApprovalRequest>;
    async fn create_cap_token(&self, token: CapToken) -> StoreResult<CapToken>;
    async fn get_cap_token(&self, id: &TokenId) -> StoreResult<Option<CapToken>>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn upsert_risk_policy(&self, policy: RiskPolicy) -> StoreResult<RiskPolicy>;
    async fn get_risk_policy(
        &self,
        action_type: &str,
        workspace_id: &str,
    ) -> StoreResult<Option<RiskPolicy>>;
    async fn list_risk_policies(&self) -> StoreResult<Vec<RiskPolicy>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> StoreResult<Session>;
    async fn get_session(&self, id: &SessionId) -> StoreResult<Option<Session>>;
    async fn find_latest_session(
        &self,
        workspace_id: &WorkspaceId,
        channel: &str,
        remote_jid: &str,
    ) -> StoreResult<Option<Session>>;
    async fn update_session(&self, session: Session) -> StoreResult<Session>;
    async fn create_objective(
        &self,
        objective: CognitiveObjective,
    ) -> StoreResult<CognitiveObjective>;
    async fn get_objective(&self, id: &ObjectiveId) -> StoreResult<Option<CognitiveObjective>>;
    async fn find_latest_objective_for_session(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<CognitiveObjective>>;
    async fn update_objective(
        &self,
        objective: CognitiveObjective,
    ) -> StoreResult<CognitiveObjective>;
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn upsert_connection(&self, connection: Connection) -> StoreResult<Connection>;
    async fn get_connection(&self, provider: &str) -> StoreResult<Option<Connection>>;
    async fn list_connections(&self) -> StoreResult<Vec<Connection>>;
    async fn delete_connection(&self, provider: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait KernelStateStore: Send + Sync {
    async fn get_state(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set_state(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Unified facade implemented by every backend; service crates depend on
/// `Arc<dyn ClawStore>` rather than a concrete backend type.
pub trait ClawStore:
    WorkspaceStore
    + IdentityStore
    + TaskStore
    + ActionRequestStore
    + TokenStore
    + ApprovalStore
    + PolicyStore
    + SessionStore
    + ConnectionStore
    + KernelStateStore
    + Send
    + Sync
{
}

impl<T> ClawStore for T where
    T: WorkspaceStore
        + IdentityStore
        + TaskStore
        + ActionRequestStore
        + TokenStore
        + ApprovalStore
        + PolicyStore
        + SessionStore
        + ConnectionStore
        + KernelStateStore
        + Send
        + Sync
{
}
