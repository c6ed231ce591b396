//! Boot-time setup/unlock gate, and the health endpoint — grounded on
//! `palm-daemon::api::rest::handlers::health`'s plain status struct.

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::State;
use axum::Json;
use clawos_crypto::sha256_hex;
use clawos_types::RECOVERY_HASH_STATE_KEY;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub db: &'static str,
    pub version: String,
    pub uptime_ms: i64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_ms = (chrono::Utc::now() - state.started_at).num_milliseconds();
    Json(HealthResponse {
        ok: true,
        db: "ok",
        version: state.version.clone(),
        uptime_ms,
    })
}

#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub recovery_phrase: String,
}

/// Idempotent: a recovery hash already on file is never overwritten.
pub async fn setup(
    State(state): State<AppState>,
    Json(body): Json<SetupRequest>,
) -> ApiResult<Json<Value>> {
    let existing = state.store.get_state(RECOVERY_HASH_STATE_KEY).await?;
    if existing.is_none() {
        let hash = sha256_hex(&body.recovery_phrase);
        state.store.set_state(RECOVERY_HASH_STATE_KEY, &hash).await?;
    }
    state.set_unlocked(true);
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub recovery_phrase: String,
}

pub async fn unlock(
    State(state): State<AppState>,
    Json(body): Json<UnlockRequest>,
) -> ApiResult<Json<Value>> {
    let stored = state
        .store
        .get_state(RECOVERY_HASH_STATE_KEY)
        .await?
        .unwrap_or_else(|| "dev".to_string());
    if sha256_hex(&body.recovery_phrase) != stored {
        return Err(ApiError::KernelLocked);
    }
    state.set_unlocked(true);
    Ok(Json(json!({ "ok": true })))
}
