//! Session resolution and advancement endpoints.

use crate::api::state::AppState;
use crate::error::ApiResult;
use axum::extract::{Path, State};
use axum::Json;
use clawos_types::{SessionId, WorkspaceId};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ResolveSessionRequest {
    pub workspace_id: String,
    pub channel: String,
    pub remote_jid: String,
    pub user_message: String,
    #[serde(default)]
    pub topic_drift_score: Option<f64>,
}

pub async fn resolve(
    State(state): State<AppState>,
    Json(body): Json<ResolveSessionRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let (session, reason) = state
        .sessions
        .resolve(
            &WorkspaceId::from(body.workspace_id),
            &body.channel,
            &body.remote_jid,
            &body.user_message,
            body.topic_drift_score,
        )
        .await?;
    Ok(Json(json!({
        "ok": true,
        "session_id": session.session_id,
        "decision": reason,
        "turn_count": session.turn_count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceSessionRequest {
    #[serde(default)]
    pub context_summary: String,
}

pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AdvanceSessionRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let session = state
        .sessions
        .advance(&SessionId::from_string(id), body.context_summary)
        .await?;
    Ok(Json(json!({
        "ok": true,
        "session_id": session.session_id,
        "turn_count": session.turn_count,
    })))
}
