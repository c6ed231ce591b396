use clawos_store::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("agent_not_found")]
    AgentNotFound,
    #[error("workspace_not_found")]
    WorkspaceNotFound,
    #[error("agent_workspace_mismatch")]
    WorkspaceMismatch,
    #[error("task_not_found")]
    TaskNotFound,
    #[error("subagent_not_found")]
    SubagentNotFound,
    #[error("subagent row is missing its parent agent or task binding")]
    MissingAgentOrTaskBinding,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
