//! Action request submission and action-level approval decisions.

use crate::api::state::AppState;
use crate::error::ApiResult;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use clawos_dispatch::DispatchOutcome;
use clawos_types::{ActionRequestId, AgentId, WorkspaceId};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct SubmitActionRequest {
    pub workspace_id: String,
    pub agent_id: String,
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub request_id: Option<String>,
}

fn bearer_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub async fn submit_action_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubmitActionRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let bearer = bearer_from(&headers);
    let outcome = state
        .dispatch
        .submit(
            WorkspaceId::from(body.workspace_id),
            AgentId::from(body.agent_id),
            body.action_type,
            body.payload,
            body.request_id.map(ActionRequestId::from_string),
            bearer.as_deref(),
        )
        .await?;

    Ok(Json(match outcome {
        DispatchOutcome::Completed(request) => json!({
            "ok": true,
            "request_id": request.request_id,
            "status": request.status,
            "result": request.result,
        }),
        DispatchOutcome::Failed(request) => json!({
            "ok": false,
            "request_id": request.request_id,
            "status": request.status,
            "result": request.result,
        }),
        DispatchOutcome::Blocked(request) => json!({
            "ok": false,
            "error": "blocked",
            "request_id": request.request_id,
            "status": request.status,
        }),
        DispatchOutcome::ApprovalRequired {
            action_request,
            approval_id,
        } => json!({
            "ok": false,
            "approval_required": true,
            "request_id": action_request.request_id,
            "approval_id": approval_id,
            "status": action_request.status,
        }),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DecideApprovalRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DecideApprovalRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let approval = state
        .approvals
        .decide_approval(&clawos_types::ApprovalId::from_string(id), true, body.reason)
        .await?;
    Ok(Json(
        json!({ "ok": true, "approval_id": approval.approval_id, "status": approval.status }),
    ))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DecideApprovalRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let approval = state
        .approvals
        .decide_approval(&clawos_types::ApprovalId::from_string(id), false, body.reason)
        .await?;
    Ok(Json(
        json!({ "ok": true, "approval_id": approval.approval_id, "status": approval.status }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ExtendApprovalRequest {
    pub extend_seconds: u64,
}

pub async fn extend_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExtendApprovalRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let approval = state
        .approvals
        .extend_approval_ttl(&clawos_types::ApprovalId::from_string(id), body.extend_seconds)
        .await?;
    Ok(Json(
        json!({ "ok": true, "approval_id": approval.approval_id, "expires_at": approval.expires_at }),
    ))
}
