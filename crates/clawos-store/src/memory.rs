//! In-memory backend: one `RwLock<HashMap<...>>` per concern, the same
//! shape as the teacher's `InMemoryMapleStorage`. Used by unit/integration
//! tests and by `--storage memory` in the kernel binary.

use crate::error::StorageError;
use crate::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clawos_types::*;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    workspaces: RwLock<HashMap<String, Workspace>>,
    agents: RwLock<HashMap<String, Agent>>,
    subagents: RwLock<HashMap<String, Subagent>>,
    tasks: RwLock<HashMap<String, Task>>,
    artifacts: RwLock<HashMap<String, Artifact>>,
    events: RwLock<Vec<Event>>,
    action_requests: RwLock<HashMap<String, ActionRequest>>,
    dcts: RwLock<HashMap<String, Dct>>,
    approvals: RwLock<HashMap<String, Approval>>,
    dars: RwLock<HashMap<String, DctApprovalRequest>>,
    cap_tokens: RwLock<HashMap<String, CapToken>>,
    risk_policies: RwLock<HashMap<(String, String), RiskPolicy>>,
    sessions: RwLock<HashMap<String, Session>>,
    objectives: RwLock<HashMap<String, CognitiveObjective>>,
    connections: RwLock<HashMap<String, Connection>>,
    kernel_state: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps a lock-poisoning panic (another writer panicked while holding the
/// lock) onto a recoverable backend error instead of propagating the
/// panic to the caller.
fn poisoned<T>() -> StoreResult<T> {
    Err(StorageError::Backend("lock poisoned".into()))
}

macro_rules! read_lock {
    ($lock:expr) => {
        match $lock.read() {
            Ok(guard) => guard,
            Err(_) => return poisoned(),
        }
    };
}

macro_rules! write_lock {
    ($lock:expr) => {
        match $lock.write() {
            Ok(guard) => guard,
            Err(_) => return poisoned(),
        }
    };
}

#[async_trait]
impl WorkspaceStore for InMemoryStore {
    async fn create_workspace(&self, workspace: Workspace) -> StoreResult<Workspace> {
        let mut map = write_lock!(self.workspaces);
        map.insert(workspace.id.as_str().to_string(), workspace.clone());
        Ok(workspace)
    }

    async fn get_workspace(&self, id: &WorkspaceId) -> StoreResult<Option<Workspace>> {
        let map = read_lock!(self.workspaces);
        Ok(map.get(id.as_str()).cloned())
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn upsert_agent(&self, agent: Agent) -> StoreResult<Agent> {
        let mut map = write_lock!(self.agents);
        map.insert(agent.agent_id.as_str().to_string(), agent.clone());
        Ok(agent)
    }

    async fn get_agent(&self, id: &AgentId) -> StoreResult<Option<Agent>> {
        let map = read_lock!(self.agents);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn insert_subagent(&self, subagent: Subagent) -> StoreResult<Subagent> {
        let mut map = write_lock!(self.subagents);
        let key = subagent.subagent_id.as_str().to_string();
        if map.contains_key(&key) {
            return Err(StorageError::AlreadyExists);
        }
        map.insert(key, subagent.clone());
        Ok(subagent)
    }

    async fn get_subagent(&self, id: &SubagentId) -> StoreResult<Option<Subagent>> {
        let map = read_lock!(self.subagents);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn update_subagent(&self, subagent: Subagent) -> StoreResult<Subagent> {
        let mut map = write_lock!(self.subagents);
        map.insert(subagent.subagent_id.as_str().to_string(), subagent.clone());
        Ok(subagent)
    }

    async fn list_subagents_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Subagent>> {
        let map = read_lock!(self.subagents);
        Ok(map
            .values()
            .filter(|s| &s.task_id == task_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn create_task(&self, task: Task) -> StoreResult<Task> {
        let mut map = write_lock!(self.tasks);
        let key = task.task_id.as_str().to_string();
        if map.contains_key(&key) {
            return Err(StorageError::AlreadyExists);
        }
        map.insert(key, task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        let map = read_lock!(self.tasks);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn update_task(&self, task: Task) -> StoreResult<Task> {
        let mut map = write_lock!(self.tasks);
        map.insert(task.task_id.as_str().to_string(), task.clone());
        Ok(task)
    }

    async fn create_artifact(&self, artifact: Artifact) -> StoreResult<Artifact> {
        let mut map = write_lock!(self.artifacts);
        map.insert(artifact.artifact_id.as_str().to_string(), artifact.clone());
        Ok(artifact)
    }

    async fn list_artifacts_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Artifact>> {
        let map = read_lock!(self.artifacts);
        Ok(map
            .values()
            .filter(|a| &a.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn append_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = write_lock!(self.events);
        events.push(event.clone());
        Ok(event)
    }

    async fn list_events_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Event>> {
        let events = read_lock!(self.events);
        Ok(events
            .iter()
            .filter(|e| &e.task_id == task_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActionRequestStore for InMemoryStore {
    async fn create_action_request(&self, request: ActionRequest) -> StoreResult<ActionRequest> {
        let mut map = write_lock!(self.action_requests);
        let key = request.request_id.as_str().to_string();
        if map.contains_key(&key) {
            return Err(StorageError::AlreadyExists);
        }
        map.insert(key, request.clone());
        Ok(request)
    }

    async fn get_action_request(
        &self,
        id: &ActionRequestId,
    ) -> StoreResult<Option<ActionRequest>> {
        let map = read_lock!(self.action_requests);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn update_action_request(&self, request: ActionRequest) -> StoreResult<ActionRequest> {
        let mut map = write_lock!(self.action_requests);
        map.insert(request.request_id.as_str().to_string(), request.clone());
        Ok(request)
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn insert_dct(&self, dct: Dct) -> StoreResult<Dct> {
        let mut map = write_lock!(self.dcts);
        map.insert(dct.token_id.as_str().to_string(), dct.clone());
        Ok(dct)
    }

    async fn get_dct(&self, id: &TokenId) -> StoreResult<Option<Dct>> {
        let map = read_lock!(self.dcts);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn update_dct(&self, dct: Dct) -> StoreResult<Dct> {
        let mut map = write_lock!(self.dcts);
        map.insert(dct.token_id.as_str().to_string(), dct.clone());
        Ok(dct)
    }

    async fn delete_expired_dcts(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut map = write_lock!(self.dcts);
        let before = map.len();
        map.retain(|_, dct| dct.expires_at > now);
        Ok((before - map.len()) as u64)
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn create_approval(&self, approval: Approval) -> StoreResult<Approval> {
        let mut map = write_lock!(self.approvals);
        map.insert(approval.approval_id.as_str().to_string(), approval.clone());
        Ok(approval)
    }

    async fn get_approval(&self, id: &ApprovalId) -> StoreResult<Option<Approval>> {
        let map = read_lock!(self.approvals);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn update_approval(&self, approval: Approval) -> StoreResult<Approval> {
        let mut map = write_lock!(self.approvals);
        map.insert(approval.approval_id.as_str().to_string(), approval.clone());
        Ok(approval)
    }

    async fn create_dar(&self, dar: DctApprovalRequest) -> StoreResult<DctApprovalRequest> {
        let mut map = write_lock!(self.dars);
        map.insert(dar.dar_id.as_str().to_string(), dar.clone());
        Ok(dar)
    }

    async fn get_dar(&self, id: &DarId) -> StoreResult<Option<DctApprovalRequest>> {
        let map = read_lock!(self.dars);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn update_dar(&self, dar: DctApprovalRequest) -> StoreResult<DctApprovalRequest> {
        let mut map = write_lock!(self.dars);
        map.insert(dar.dar_id.as_str().to_string(), dar.clone());
        Ok(dar)
    }

    async fn create_cap_token(&self, token: CapToken) -> StoreResult<CapToken> {
        let mut map = write_lock!(self.cap_tokens);
        map.insert(token.token_id.as_str().to_string(), token.clone());
        Ok(token)
    }

    async fn get_cap_token(&self, id: &TokenId) -> StoreResult<Option<CapToken>> {
        let map = read_lock!(self.cap_tokens);
        Ok(map.get(id.as_str()).cloned())
    }
}

#[async_trait]
impl PolicyStore for InMemoryStore {
    async fn upsert_risk_policy(&self, policy: RiskPolicy) -> StoreResult<RiskPolicy> {
        let mut map = write_lock!(self.risk_policies);
        let key = (
            policy.action_type.clone(),
            policy.workspace_id.as_str().to_string(),
        );
        map.insert(key, policy.clone());
        Ok(policy)
    }

    async fn get_risk_policy(
        &self,
        action_type: &str,
        workspace_id: &str,
    ) -> StoreResult<Option<RiskPolicy>> {
        let map = read_lock!(self.risk_policies);
        Ok(map
            .get(&(action_type.to_string(), workspace_id.to_string()))
            .cloned())
    }

    async fn list_risk_policies(&self) -> StoreResult<Vec<RiskPolicy>> {
        let map = read_lock!(self.risk_policies);
        Ok(map.values().cloned().collect())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        let mut map = write_lock!(self.sessions);
        map.insert(session.session_id.as_str().to_string(), session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let map = read_lock!(self.sessions);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn find_latest_session(
        &self,
        workspace_id: &WorkspaceId,
        channel: &str,
        remote_jid: &str,
    ) -> StoreResult<Option<Session>> {
        let map = read_lock!(self.sessions);
        Ok(map
            .values()
            .filter(|s| {
                &s.workspace_id == workspace_id && s.channel == channel && s.remote_jid == remote_jid
            })
            .max_by_key(|s| s.last_message_at)
            .cloned())
    }

    async fn update_session(&self, session: Session) -> StoreResult<Session> {
        let mut map = write_lock!(self.sessions);
        map.insert(session.session_id.as_str().to_string(), session.clone());
        Ok(session)
    }

    async fn create_objective(
        &self,
        objective: CognitiveObjective,
    ) -> StoreResult<CognitiveObjective> {
        let mut map = write_lock!(self.objectives);
        map.insert(objective.objective_id.as_str().to_string(), objective.clone());
        Ok(objective)
    }

    async fn get_objective(&self, id: &ObjectiveId) -> StoreResult<Option<CognitiveObjective>> {
        let map = read_lock!(self.objectives);
        Ok(map.get(id.as_str()).cloned())
    }

    async fn find_latest_objective_for_session(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<CognitiveObjective>> {
        let map = read_lock!(self.objectives);
        Ok(map
            .values()
            .filter(|o| &o.session_id == session_id)
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn update_objective(
        &self,
        objective: CognitiveObjective,
    ) -> StoreResult<CognitiveObjective> {
        let mut map = write_lock!(self.objectives);
        map.insert(objective.objective_id.as_str().to_string(), objective.clone());
        Ok(objective)
    }
}

#[async_trait]
impl ConnectionStore for InMemoryStore {
    async fn upsert_connection(&self, connection: Connection) -> StoreResult<Connection> {
        let mut map = write_lock!(self.connections);
        map.insert(connection.provider.clone(), connection.clone());
        Ok(connection)
    }

    async fn get_connection(&self, provider: &str) -> StoreResult<Option<Connection>> {
        let map = read_lock!(self.connections);
        Ok(map.get(provider).cloned())
    }

    async fn list_connections(&self) -> StoreResult<Vec<Connection>> {
        let map = read_lock!(self.connections);
        Ok(map.values().cloned().collect())
    }

    async fn delete_connection(&self, provider: &str) -> StoreResult<()> {
        let mut map = write_lock!(self.connections);
        map.remove(provider);
        Ok(())
    }
}

#[async_trait]
impl KernelStateStore for InMemoryStore {
    async fn get_state(&self, key: &str) -> StoreResult<Option<String>> {
        let map = read_lock!(self.kernel_state);
        Ok(map.get(key).cloned())
    }

    async fn set_state(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = write_lock!(self.kernel_state);
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
