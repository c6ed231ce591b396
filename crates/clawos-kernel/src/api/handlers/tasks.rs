//! Task lifecycle endpoints: create, snapshot, events, verify, artifacts.

use crate::api::state::AppState;
use crate::error::ApiResult;
use axum::extract::{Path, State};
use axum::Json;
use clawos_tasks::VerificationResult;
use clawos_types::{ActorKind, Artifact, Contract, Event, Task, TaskId};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub workspace_id: String,
    pub created_by_agent_id: String,
    pub title: String,
    pub intent: String,
    pub contract: Contract,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    state.assert_unlocked()?;
    let task = state
        .tasks
        .create_task(
            body.workspace_id.into(),
            body.created_by_agent_id.into(),
            body.title,
            body.intent,
            body.contract,
        )
        .await?;
    Ok(Json(task))
}

#[derive(Debug, serde::Serialize)]
pub struct TaskSnapshotResponse {
    pub task: Task,
    pub subagents: Vec<clawos_types::Subagent>,
    pub artifacts: Vec<Artifact>,
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskSnapshotResponse>> {
    state.assert_unlocked()?;
    let snapshot = state.tasks.snapshot(&TaskId::from_string(id)).await?;
    Ok(Json(TaskSnapshotResponse {
        task: snapshot.task,
        subagents: snapshot.subagents,
        artifacts: snapshot.artifacts,
    }))
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Event>>> {
    state.assert_unlocked()?;
    let events = state.tasks.list_events(&TaskId::from_string(id)).await?;
    Ok(Json(events))
}

pub async fn verify_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VerificationResult>> {
    state.assert_unlocked()?;
    let result = state.tasks.verify(&TaskId::from_string(id)).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct AttachArtifactRequest {
    pub actor_kind: ActorKind,
    pub actor_id: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

pub async fn attach_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AttachArtifactRequest>,
) -> ApiResult<Json<Artifact>> {
    state.assert_unlocked()?;
    let artifact = state
        .tasks
        .attach_artifact(
            &TaskId::from_string(id),
            body.actor_kind,
            body.actor_id,
            body.artifact_type,
            body.content,
            body.uri,
            body.metadata,
        )
        .await?;
    Ok(Json(artifact))
}
