//! Operator-facing administration: encrypted third-party connections and
//! per-workspace risk policy overrides. Never echoes a decrypted secret
//! back over the wire.

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use clawos_types::{Connection, ConnectionStatus, PolicyMode, RiskPolicy, WorkspaceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ConnectionSummary {
    pub provider: String,
    pub status: ConnectionStatus,
    pub last_tested_at: Option<chrono::DateTime<Utc>>,
    pub last_error: Option<String>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<Connection> for ConnectionSummary {
    fn from(c: Connection) -> Self {
        Self {
            provider: c.provider,
            status: c.status,
            last_tested_at: c.last_tested_at,
            last_error: c.last_error,
            updated_at: c.updated_at,
        }
    }
}

pub async fn list_connections(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ConnectionSummary>>> {
    state.assert_unlocked()?;
    let connections = state.store.list_connections().await?;
    Ok(Json(connections.into_iter().map(ConnectionSummary::from).collect()))
}

pub async fn get_connection(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Json<ConnectionSummary>> {
    state.assert_unlocked()?;
    let connection = state
        .store
        .get_connection(&provider)
        .await?
        .ok_or(ApiError::ConnectionNotFound)?;
    Ok(Json(ConnectionSummary::from(connection)))
}

#[derive(Debug, Deserialize)]
pub struct UpsertConnectionRequest {
    pub provider: String,
    pub secret: Value,
}

pub async fn upsert_connection(
    State(state): State<AppState>,
    Json(body): Json<UpsertConnectionRequest>,
) -> ApiResult<Json<ConnectionSummary>> {
    state.assert_unlocked()?;
    let encrypted_secret = clawos_crypto::encrypt(&state.master_key, &body.secret)?;
    let connection = state
        .store
        .upsert_connection(Connection {
            provider: body.provider,
            encrypted_secret,
            status: ConnectionStatus::Untested,
            last_tested_at: None,
            last_error: None,
            updated_at: Utc::now(),
        })
        .await?;
    Ok(Json(ConnectionSummary::from(connection)))
}

pub async fn delete_connection(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    state.store.delete_connection(&provider).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn list_risk_policies(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RiskPolicy>>> {
    state.assert_unlocked()?;
    Ok(Json(state.policy.list_policies().await?))
}

#[derive(Debug, Deserialize)]
pub struct RiskPolicyQuery {
    #[serde(default = "default_workspace")]
    pub workspace_id: String,
}

pub async fn get_risk_policy(
    State(state): State<AppState>,
    Path(action_type): Path<String>,
    axum::extract::Query(query): axum::extract::Query<RiskPolicyQuery>,
) -> ApiResult<Json<RiskPolicy>> {
    state.assert_unlocked()?;
    let policy = state
        .policy
        .get_policy(&action_type, &WorkspaceId::from(query.workspace_id))
        .await?
        .ok_or(ApiError::RiskPolicyNotFound)?;
    Ok(Json(policy))
}

#[derive(Debug, Deserialize)]
pub struct SetRiskPolicyRequest {
    pub action_type: String,
    #[serde(default = "default_workspace")]
    pub workspace_id: String,
    pub mode: PolicyMode,
}

#[derive(Debug, Deserialize)]
pub struct SetRiskPolicyByActionRequest {
    #[serde(default = "default_workspace")]
    pub workspace_id: String,
    pub mode: PolicyMode,
}

fn default_workspace() -> String {
    clawos_types::WILDCARD_WORKSPACE.to_string()
}

pub async fn set_risk_policy(
    State(state): State<AppState>,
    Json(body): Json<SetRiskPolicyRequest>,
) -> ApiResult<Json<RiskPolicy>> {
    state.assert_unlocked()?;
    if body.action_type.trim().is_empty() {
        return Err(ApiError::MissingField("action_type"));
    }
    let policy = state
        .policy
        .set_policy(&body.action_type, &WorkspaceId::from(body.workspace_id), body.mode)
        .await?;
    Ok(Json(policy))
}

pub async fn set_risk_policy_for_action(
    State(state): State<AppState>,
    Path(action_type): Path<String>,
    Json(body): Json<SetRiskPolicyByActionRequest>,
) -> ApiResult<Json<RiskPolicy>> {
    state.assert_unlocked()?;
    let policy = state
        .policy
        .set_policy(&action_type, &WorkspaceId::from(body.workspace_id), body.mode)
        .await?;
    Ok(Json(policy))
}
