//! DCT minting (with the DAR approval detour) and cap-token issuance
//! and verification.

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use clawos_tokens::MintRequest;
use clawos_types::{
    event_types, ActorKind, AgentId, DarId, Event, EventId, PrincipalKind, ScopeSpec, SubagentId,
    TaskId, WorkspaceId,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct IssueToSpec {
    pub kind: PrincipalKind,
    pub id: String,
}

fn default_ttl() -> u64 {
    600
}

#[derive(Debug, Deserialize)]
pub struct RequestTokenRequest {
    pub workspace_id: String,
    pub requesting_agent_id: String,
    pub issue_to: IssueToSpec,
    #[serde(default)]
    pub scope: ScopeSpec,
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub dar_id: Option<String>,
}

/// `spec.md` §4.4/§4.6/P3: validates that the requesting agent owns the
/// principal the token is issued to, then either mints directly (`auto`),
/// re-validates an already-decided DAR, or opens a new one (`ask`).
pub async fn request_token(
    State(state): State<AppState>,
    Json(body): Json<RequestTokenRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let workspace_id = WorkspaceId::from(body.workspace_id);
    let requesting_agent = AgentId::from(body.requesting_agent_id);
    state
        .identity
        .assert_agent(&requesting_agent, &workspace_id)
        .await?;

    match body.issue_to.kind {
        PrincipalKind::Agent => {
            if body.issue_to.id != requesting_agent.as_str() {
                return Err(ApiError::AgentsMayOnlyRequestTokensForThemselves);
            }
        }
        PrincipalKind::Subagent => {
            let subagent = state
                .identity
                .assert_subagent(&SubagentId::from_string(body.issue_to.id.clone()), &workspace_id)
                .await?;
            if subagent.parent_agent_id != requesting_agent {
                return Err(ApiError::SubagentNotOwned);
            }
        }
    }

    let task = match &body.task_id {
        Some(task_id) => Some(state.tasks.get_task(&TaskId::from_string(task_id.clone())).await?),
        None => None,
    };
    let parent_authority = task.as_ref().map(|t| &t.contract.scope);

    if let Some(dar_id) = &body.dar_id {
        let dar = state
            .approvals
            .validate_dar_for_mint(&DarId::from_string(dar_id.clone()), &requesting_agent)
            .await?;
        let mint_request = MintRequest {
            workspace_id: workspace_id.clone(),
            issued_to_kind: dar.issue_to_kind,
            issued_to_id: dar.issue_to_id,
            parent_agent_id: Some(requesting_agent.clone()),
            task_id: body.task_id.as_ref().map(|id| TaskId::from_string(id.clone())),
            scope: dar.scope,
            ttl_seconds: dar.ttl_seconds,
        };
        let (dct, bearer) = state.tokens.mint_dct(mint_request, parent_authority).await?;
        emit_token_issued(&state, &dct.workspace_id, body.task_id.as_deref(), &dct.token_id.to_string()).await?;
        return Ok(Json(json!({ "ok": true, "token": bearer, "token_id": dct.token_id, "expires_at": dct.expires_at })));
    }

    let evaluation = state.policy.evaluate_scope(&body.scope, &workspace_id).await?;
    if evaluation.blocked {
        return Err(ApiError::ScopeBlockedByPolicy);
    }
    if evaluation.approval_required {
        let dar = state
            .approvals
            .create_dar(
                workspace_id,
                requesting_agent,
                body.issue_to.kind,
                body.issue_to.id,
                body.scope,
                body.ttl_seconds,
                evaluation.risk_level,
            )
            .await?;
        return Ok(Json(json!({
            "ok": true,
            "needs_approval": true,
            "dar_id": dar.dar_id,
            "risk_level": dar.risk_level,
        })));
    }

    let mint_request = MintRequest {
        workspace_id: workspace_id.clone(),
        issued_to_kind: body.issue_to.kind,
        issued_to_id: body.issue_to.id,
        parent_agent_id: Some(requesting_agent),
        task_id: body.task_id.as_ref().map(|id| TaskId::from_string(id.clone())),
        scope: body.scope,
        ttl_seconds: body.ttl_seconds,
    };
    let (dct, bearer) = state.tokens.mint_dct(mint_request, parent_authority).await?;
    emit_token_issued(&state, &dct.workspace_id, body.task_id.as_deref(), &dct.token_id.to_string()).await?;
    Ok(Json(json!({ "ok": true, "token": bearer, "token_id": dct.token_id, "expires_at": dct.expires_at })))
}

async fn emit_token_issued(
    state: &AppState,
    workspace_id: &WorkspaceId,
    task_id: Option<&str>,
    token_id: &str,
) -> ApiResult<()> {
    let Some(task_id) = task_id else {
        return Ok(());
    };
    state
        .store
        .append_event(Event {
            event_id: EventId::new(),
            workspace_id: workspace_id.clone(),
            task_id: TaskId::from_string(task_id.to_string()),
            actor_kind: ActorKind::System,
            actor_id: "kernel".into(),
            event_type: event_types::TOKEN_ISSUED.to_string(),
            ts: Utc::now(),
            data: json!({ "token_id": token_id }),
        })
        .await?;
    Ok(())
}

pub async fn grant_dar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let dar = state.approvals.decide_dar(&DarId::from_string(id), true).await?;
    Ok(Json(json!({ "ok": true, "dar_id": dar.dar_id, "status": dar.status })))
}

pub async fn deny_dar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let dar = state.approvals.decide_dar(&DarId::from_string(id), false).await?;
    Ok(Json(json!({ "ok": true, "dar_id": dar.dar_id, "status": dar.status })))
}

#[derive(Debug, Deserialize)]
pub struct ExtendTtlRequest {
    pub extend_seconds: u64,
}

pub async fn extend_dar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ExtendTtlRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let dar = state
        .approvals
        .extend_dar_ttl(&DarId::from_string(id), body.extend_seconds)
        .await?;
    Ok(Json(json!({ "ok": true, "dar_id": dar.dar_id, "expires_at": dar.expires_at })))
}

#[derive(Debug, Deserialize)]
pub struct IssueCapTokenRequest {
    pub workspace_id: String,
    pub action_request_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

pub async fn issue_cap_token(
    State(state): State<AppState>,
    Json(body): Json<IssueCapTokenRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let (token, bearer) = state
        .approvals
        .issue_cap_token(
            WorkspaceId::from(body.workspace_id),
            clawos_types::ActionRequestId::from_string(body.action_request_id),
            body.tool_name,
            body.ttl_seconds,
        )
        .await?;
    Ok(Json(json!({ "ok": true, "token": bearer, "expires_at": token.expires_at })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCapTokenRequest {
    pub token: String,
    pub workspace_id: String,
    pub action_request_id: String,
    pub tool_name: String,
}

pub async fn verify_cap_token(
    State(state): State<AppState>,
    Json(body): Json<VerifyCapTokenRequest>,
) -> ApiResult<Json<Value>> {
    state.assert_unlocked()?;
    let token = state
        .approvals
        .verify_cap_token(
            &body.token,
            &WorkspaceId::from(body.workspace_id),
            &clawos_types::ActionRequestId::from_string(body.action_request_id),
            &body.tool_name,
        )
        .await?;
    Ok(Json(json!({ "ok": true, "valid": true, "expires_at": token.expires_at })))
}
