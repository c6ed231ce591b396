//! Subagent spawn and run endpoints.

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use clawos_types::{
    event_types, ActorKind, Event, EventId, Subagent, SubagentId, TaskId, WorkspaceId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct SpawnSubagentRequest {
    pub workspace_id: String,
    pub parent_agent_id: String,
    pub task_id: String,
    pub worker_type: String,
    #[serde(default)]
    pub step_id: Option<String>,
}

pub async fn spawn_subagent(
    State(state): State<AppState>,
    Json(body): Json<SpawnSubagentRequest>,
) -> ApiResult<Json<Subagent>> {
    state.assert_unlocked()?;
    let subagent = state
        .identity
        .spawn_subagent(
            &WorkspaceId::from(body.workspace_id),
            &body.parent_agent_id.into(),
            &TaskId::from_string(body.task_id),
            body.worker_type,
            body.step_id,
        )
        .await?;

    state
        .store
        .append_event(Event {
            event_id: EventId::new(),
            workspace_id: subagent.workspace_id.clone(),
            task_id: subagent.task_id.clone(),
            actor_kind: ActorKind::System,
            actor_id: "kernel".into(),
            event_type: event_types::SUBAGENT_SPAWNED.to_string(),
            ts: Utc::now(),
            data: json!({ "subagent_id": subagent.subagent_id }),
        })
        .await?;

    Ok(Json(subagent))
}

#[derive(Debug, Deserialize)]
pub struct RunSubagentRequest {
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Serialize)]
pub struct RunSubagentResponse {
    pub ok: bool,
    pub artifact_id: String,
}

fn bearer_from(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(ApiError::InvalidOrExpiredToken)
}

pub async fn run_subagent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RunSubagentRequest>,
) -> ApiResult<Json<RunSubagentResponse>> {
    state.assert_unlocked()?;
    let bearer = bearer_from(&headers)?;
    let artifact = state
        .worker
        .run_subagent(
            &SubagentId::from_string(id),
            &bearer,
            body.input,
            state.dispatch.clone(),
        )
        .await?;
    Ok(Json(RunSubagentResponse {
        ok: true,
        artifact_id: artifact.artifact_id.to_string(),
    }))
}
