//! CRUD and invariant enforcement for agents and subagents.
//!
//! Generalizes the teacher's `IdentityRegistry` (an in-process
//! `RwLock<HashMap<AgentId, RegisteredAgent>>` with register/lookup/verify
//! methods) into a store-backed service: the registry itself lives in
//! `clawos_store`, this crate owns the invariants.

mod error;

pub use error::IdentityError;

use chrono::Utc;
use clawos_store::ClawStore;
use clawos_types::*;
use std::sync::Arc;

pub struct IdentityService {
    store: Arc<dyn ClawStore>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn ClawStore>) -> Self {
        Self { store }
    }

    /// Upserts an agent; succeeds idempotently and returns the stored row.
    pub async fn create_agent(
        &self,
        workspace_id: &WorkspaceId,
        agent_id: AgentId,
        role: String,
    ) -> Result<Agent, IdentityError> {
        self.store
            .get_workspace(workspace_id)
            .await?
            .ok_or(IdentityError::WorkspaceNotFound)?;

        let agent = Agent {
            agent_id,
            workspace_id: workspace_id.clone(),
            role,
            created_at: Utc::now(),
        };
        Ok(self.store.upsert_agent(agent).await?)
    }

    pub async fn assert_agent(
        &self,
        agent_id: &AgentId,
        workspace_id: &WorkspaceId,
    ) -> Result<Agent, IdentityError> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or(IdentityError::AgentNotFound)?;
        if &agent.workspace_id != workspace_id {
            return Err(IdentityError::WorkspaceMismatch);
        }
        Ok(agent)
    }

    /// Requires that the parent agent and the task exist in the same
    /// workspace; returns a freshly `created` subagent.
    pub async fn spawn_subagent(
        &self,
        workspace_id: &WorkspaceId,
        parent_agent_id: &AgentId,
        task_id: &TaskId,
        worker_type: String,
        step_id: Option<String>,
    ) -> Result<Subagent, IdentityError> {
        self.assert_agent(parent_agent_id, workspace_id).await?;

        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or(IdentityError::TaskNotFound)?;
        if &task.workspace_id != workspace_id {
            return Err(IdentityError::WorkspaceMismatch);
        }

        let subagent = Subagent {
            subagent_id: SubagentId::new(),
            parent_agent_id: parent_agent_id.clone(),
            workspace_id: workspace_id.clone(),
            task_id: task_id.clone(),
            step_id,
            worker_type,
            status: SubagentStatus::Created,
            created_at: Utc::now(),
            finished_at: None,
        };
        let stored = self.store.insert_subagent(subagent).await?;
        tracing::info!(subagent_id = %stored.subagent_id, task_id = %task_id, "subagent spawned");
        Ok(stored)
    }

    pub async fn assert_subagent(
        &self,
        subagent_id: &SubagentId,
        workspace_id: &WorkspaceId,
    ) -> Result<Subagent, IdentityError> {
        let subagent = self
            .store
            .get_subagent(subagent_id)
            .await?
            .ok_or(IdentityError::SubagentNotFound)?;
        if subagent.parent_agent_id.as_str().is_empty() || subagent.task_id.as_str().is_empty() {
            return Err(IdentityError::MissingAgentOrTaskBinding);
        }
        if subagent.workspace_id != *workspace_id {
            return Err(IdentityError::WorkspaceMismatch);
        }
        Ok(subagent)
    }

    /// Sets `finished_at` whenever the new status is terminal.
    pub async fn update_subagent_status(
        &self,
        subagent_id: &SubagentId,
        status: SubagentStatus,
    ) -> Result<Subagent, IdentityError> {
        let mut subagent = self
            .store
            .get_subagent(subagent_id)
            .await?
            .ok_or(IdentityError::SubagentNotFound)?;
        subagent.status = status;
        if status.is_terminal() {
            subagent.finished_at = Some(Utc::now());
        }
        Ok(self.store.update_subagent(subagent).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawos_store::InMemoryStore;

    async fn seeded() -> (IdentityService, WorkspaceId, TaskId) {
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

        let service = IdentityService::new(store.clone());
        service
            .create_agent(&workspace_id, AgentId::from("orchestrator"), "admin".into())
            .await
            .unwrap();

        let task_id = TaskId::new();
        store
            .create_task(Task {
                task_id: task_id.clone(),
                workspace_id: workspace_id.clone(),
                created_by_agent_id: AgentId::from("orchestrator"),
                title: "t".into(),
                intent: "i".into(),
                contract: Contract {
                    objective: "o".into(),
                    scope: ScopeSpec::default(),
                    deliverables: vec![],
                    acceptance_checks: vec![],
                },
                plan: None,
                status: TaskStatus::Queued,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        (service, workspace_id, task_id)
    }

    #[tokio::test]
    async fn create_agent_is_idempotent() {
        let (service, workspace_id, _) = seeded().await;
        let first = service
            .create_agent(&workspace_id, AgentId::from("orchestrator"), "admin".into())
            .await
            .unwrap();
        let second = service
            .create_agent(&workspace_id, AgentId::from("orchestrator"), "admin".into())
            .await
            .unwrap();
        assert_eq!(first.agent_id, second.agent_id);
    }

    #[tokio::test]
    async fn spawn_subagent_requires_matching_workspace() {
        let (service, workspace_id, task_id) = seeded().await;
        let other_workspace = WorkspaceId::new();
        let err = service
            .spawn_subagent(
                &other_workspace,
                &AgentId::from("orchestrator"),
                &task_id,
                "web_researcher".into(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AgentNotFound));
    }

    #[tokio::test]
    async fn update_subagent_status_sets_finished_at_on_terminal_transition() {
        let (service, workspace_id, task_id) = seeded().await;
        let subagent = service
            .spawn_subagent(
                &workspace_id,
                &AgentId::from("orchestrator"),
                &task_id,
                "web_researcher".into(),
                None,
            )
            .await
            .unwrap();
        assert!(subagent.finished_at.is_none());

        let finished = service
            .update_subagent_status(&subagent.subagent_id, SubagentStatus::Finished)
            .await
            .unwrap();
        assert!(finished.finished_at.is_some());
    }
}
