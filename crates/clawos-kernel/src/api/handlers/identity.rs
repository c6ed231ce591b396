//! Workspace and agent endpoints.

use crate::api::state::AppState;
use crate::error::ApiResult;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use clawos_types::{AgentId, Workspace, WorkspaceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    #[serde(rename = "type", default = "default_workspace_type")]
    pub workspace_type: String,
}

fn default_workspace_type() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize)]
pub struct CreateWorkspaceResponse {
    pub ok: bool,
    pub workspace_id: String,
}

pub async fn create_workspace(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkspaceRequest>,
) -> ApiResult<Json<CreateWorkspaceResponse>> {
    state.assert_unlocked()?;
    let workspace = state
        .store
        .create_workspace(Workspace {
            id: WorkspaceId::new(),
            workspace_type: body.workspace_type,
            created_at: Utc::now(),
        })
        .await?;
    Ok(Json(CreateWorkspaceResponse {
        ok: true,
        workspace_id: workspace.id.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpsertAgentRequest {
    pub workspace_id: String,
    pub agent_id: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub ok: bool,
    pub agent_id: String,
    pub role: String,
}

pub async fn upsert_agent(
    State(state): State<AppState>,
    Json(body): Json<UpsertAgentRequest>,
) -> ApiResult<Json<AgentResponse>> {
    state.assert_unlocked()?;
    let agent = state
        .identity
        .create_agent(
            &WorkspaceId::from(body.workspace_id),
            AgentId::from(body.agent_id),
            body.role,
        )
        .await?;
    Ok(Json(AgentResponse {
        ok: true,
        agent_id: agent.agent_id.to_string(),
        role: agent.role,
    }))
}
