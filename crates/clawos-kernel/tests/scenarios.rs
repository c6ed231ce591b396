//! End-to-end HTTP scenarios over a fully wired router, an in-memory
//! store standing in for the SQLite backend `Server::new` would pick.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use clawos_approvals::ApprovalService;
use clawos_crypto::{HmacKey, MasterKey};
use clawos_dispatch::{DispatchService, HandlerRegistry};
use clawos_identity::IdentityService;
use clawos_kernel::action_handlers::default_handlers;
use clawos_kernel::api::{create_router, AppState};
use clawos_policy::PolicyEngine;
use clawos_session::{SessionConfig, SessionService};
use clawos_store::{ClawStore, InMemoryStore};
use clawos_tasks::TaskService;
use clawos_tokens::TokenService;
use clawos_worker::{WorkerHandlerRegistry, WorkerService};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> Router {
    let store: Arc<dyn ClawStore> = Arc::new(InMemoryStore::new());
    let identity = Arc::new(IdentityService::new(store.clone()));
    let policy = Arc::new(PolicyEngine::new(store.clone()));
    policy.seed_defaults_if_absent().await.unwrap();
    let hmac_key = HmacKey::dev();
    let tokens = Arc::new(TokenService::new(store.clone(), hmac_key.clone()));
    let approvals = Arc::new(ApprovalService::new(store.clone(), hmac_key));
    let dispatch = Arc::new(DispatchService::new(
        store.clone(),
        policy.clone(),
        approvals.clone(),
        HandlerRegistry::new(default_handlers()),
    ));
    let worker = Arc::new(WorkerService::new(
        store.clone(),
        identity.clone(),
        tokens.clone(),
        WorkerHandlerRegistry::new(vec![]),
    ));
    let tasks = Arc::new(TaskService::new(store.clone(), identity.clone()));
    let sessions = Arc::new(SessionService::new(store.clone(), SessionConfig::default()));
    let state = AppState::new(
        store,
        identity,
        policy,
        tokens,
        approvals,
        dispatch,
        worker,
        tasks,
        sessions,
        MasterKey::generate(),
        true,
    );
    create_router(state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", format!("Bearer {bearer}"));
    }
    let payload = body.unwrap_or(Value::Null);
    let request = builder
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Scenario 1: health.
#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let (status, body) = call(&app, "GET", "/kernel/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["db"], json!("ok"));
    assert!(body["ms"].is_number());
}

async fn create_workspace_and_agent(app: &Router) -> (String, String) {
    let (_, body) = call(&app, "POST", "/kernel/workspaces", Some(json!({})), None).await;
    let workspace_id = body["workspace_id"].as_str().unwrap().to_string();

    call(
        app,
        "POST",
        "/kernel/agents",
        Some(json!({ "workspace_id": workspace_id, "agent_id": "orchestrator", "role": "admin" })),
        None,
    )
    .await;
    (workspace_id, "orchestrator".to_string())
}

/// Scenario 2: low-risk flow, end to end.
#[tokio::test]
async fn low_risk_flow_spawns_and_runs_a_subagent() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    let (_, task_body) = call(
        &app,
        "POST",
        "/kernel/tasks",
        Some(json!({
            "workspace_id": workspace_id,
            "created_by_agent_id": agent_id,
            "title": "free disk space",
            "intent": "find and report disk hogs",
            "contract": {
                "objective": "find disk hogs",
                "scope": { "allowed_tools": ["web_search"] },
                "deliverables": [],
                "acceptance_checks": [],
            },
        })),
        None,
    )
    .await;
    let task_id = task_body["task_id"].as_str().unwrap().to_string();

    let (_, spawn_body) = call(
        &app,
        "POST",
        "/kernel/subagents",
        Some(json!({
            "workspace_id": workspace_id,
            "parent_agent_id": agent_id,
            "task_id": task_id,
            "worker_type": "web_researcher",
        })),
        None,
    )
    .await;
    let subagent_id = spawn_body["subagent_id"].as_str().unwrap().to_string();

    let (status, token_body) = call(
        &app,
        "POST",
        "/kernel/tokens/request",
        Some(json!({
            "workspace_id": workspace_id,
            "requesting_agent_id": agent_id,
            "issue_to": { "kind": "subagent", "id": subagent_id },
            "scope": { "allowed_tools": ["web_search"] },
            "ttl_seconds": 600,
            "task_id": task_id,
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bearer = token_body["token"].as_str().unwrap().to_string();

    let (status, run_body) = call(
        &app,
        "POST",
        &format!("/kernel/subagents/{subagent_id}/run"),
        Some(json!({ "input": { "query": "how to free disk space" } })),
        Some(&bearer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run_body["ok"], json!(true));
    assert!(run_body["artifact_id"].is_string());

    let (_, events_body) = call(&app, "GET", &format!("/kernel/tasks/{task_id}/events"), None, None).await;
    let types: Vec<&str> = events_body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "subagent.spawned",
            "token.issued",
            "worker.started",
            "worker.completed",
        ]
    );

    // P6: a second run after completion is rejected.
    let (status, _) = call(
        &app,
        "POST",
        &format!("/kernel/subagents/{subagent_id}/run"),
        Some(json!({ "input": {} })),
        Some(&bearer),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

/// Scenario 3: high-risk scope requires a DAR before minting.
#[tokio::test]
async fn high_risk_scope_requires_grant_before_minting() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    let (_, task_body) = call(
        &app,
        "POST",
        "/kernel/tasks",
        Some(json!({
            "workspace_id": workspace_id,
            "created_by_agent_id": agent_id,
            "title": "disk check",
            "intent": "check disk usage",
            "contract": {
                "objective": "check disk usage",
                "scope": { "allowed_tools": ["run_shell"] },
                "deliverables": [],
                "acceptance_checks": [],
            },
        })),
        None,
    )
    .await;
    let task_id = task_body["task_id"].as_str().unwrap().to_string();

    let (_, spawn_body) = call(
        &app,
        "POST",
        "/kernel/subagents",
        Some(json!({
            "workspace_id": workspace_id,
            "parent_agent_id": agent_id,
            "task_id": task_id,
            "worker_type": "shell_runner",
        })),
        None,
    )
    .await;
    let subagent_id = spawn_body["subagent_id"].as_str().unwrap().to_string();

    let (_, first) = call(
        &app,
        "POST",
        "/kernel/tokens/request",
        Some(json!({
            "workspace_id": workspace_id,
            "requesting_agent_id": agent_id,
            "issue_to": { "kind": "subagent", "id": subagent_id },
            "scope": { "allowed_tools": ["run_shell"] },
            "ttl_seconds": 600,
            "task_id": task_id,
        })),
        None,
    )
    .await;
    assert_eq!(first["needs_approval"], json!(true));
    assert_eq!(first["risk_level"], json!("HIGH"));
    let dar_id = first["dar_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "POST",
        &format!("/kernel/dct_approvals/{dar_id}/grant"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, second) = call(
        &app,
        "POST",
        "/kernel/tokens/request",
        Some(json!({
            "workspace_id": workspace_id,
            "requesting_agent_id": agent_id,
            "issue_to": { "kind": "subagent", "id": subagent_id },
            "scope": { "allowed_tools": ["run_shell"] },
            "ttl_seconds": 600,
            "task_id": task_id,
            "dar_id": dar_id,
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bearer = second["token"].as_str().unwrap().to_string();

    let (status, run_body) = call(
        &app,
        "POST",
        &format!("/kernel/subagents/{subagent_id}/run"),
        Some(json!({ "input": { "command": "df -h" } })),
        Some(&bearer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run_body["ok"], json!(true));
}

/// Scenario 4 / P1: repeating a request_id with a different payload conflicts.
#[tokio::test]
async fn idempotent_request_id_conflicts_on_payload_mismatch() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    let (status, first) = call(
        &app,
        "POST",
        "/kernel/action_requests",
        Some(json!({
            "workspace_id": workspace_id,
            "agent_id": agent_id,
            "action_type": "web_search",
            "payload": { "q": "x" },
            "request_id": "ar_fixed",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["ok"], json!(true));

    let (status, _) = call(
        &app,
        "POST",
        "/kernel/action_requests",
        Some(json!({
            "workspace_id": workspace_id,
            "agent_id": agent_id,
            "action_type": "web_search",
            "payload": { "q": "y" },
            "request_id": "ar_fixed",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same id, same payload: identical response, no new row.
    let (status, repeat) = call(
        &app,
        "POST",
        "/kernel/action_requests",
        Some(json!({
            "workspace_id": workspace_id,
            "agent_id": agent_id,
            "action_type": "web_search",
            "payload": { "q": "x" },
            "request_id": "ar_fixed",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repeat["request_id"], first["request_id"]);
}

/// Scenario 5 / P9: a tampered bearer signature is rejected, not merely
/// treated as unauthenticated.
#[tokio::test]
async fn tampered_bearer_signature_is_rejected() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    let (_, task_body) = call(
        &app,
        "POST",
        "/kernel/tasks",
        Some(json!({
            "workspace_id": workspace_id,
            "created_by_agent_id": agent_id,
            "title": "t",
            "intent": "i",
            "contract": { "objective": "o", "scope": { "allowed_tools": ["web_search"] }, "deliverables": [], "acceptance_checks": [] },
        })),
        None,
    )
    .await;
    let task_id = task_body["task_id"].as_str().unwrap().to_string();

    let (_, spawn_body) = call(
        &app,
        "POST",
        "/kernel/subagents",
        Some(json!({
            "workspace_id": workspace_id,
            "parent_agent_id": agent_id,
            "task_id": task_id,
            "worker_type": "web_researcher",
        })),
        None,
    )
    .await;
    let subagent_id = spawn_body["subagent_id"].as_str().unwrap().to_string();

    let (_, token_body) = call(
        &app,
        "POST",
        "/kernel/tokens/request",
        Some(json!({
            "workspace_id": workspace_id,
            "requesting_agent_id": agent_id,
            "issue_to": { "kind": "subagent", "id": subagent_id },
            "scope": { "allowed_tools": ["web_search"] },
            "ttl_seconds": 600,
            "task_id": task_id,
        })),
        None,
    )
    .await;
    let bearer = token_body["token"].as_str().unwrap().to_string();
    let mut tampered = bearer.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    let tampered = String::from_utf8(tampered).unwrap();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/kernel/subagents/{subagent_id}/run"),
        Some(json!({ "input": {} })),
        Some(&tampered),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("invalid_or_expired_token"));
}

/// Scenario 6 / P7: a reset keyword opens a fresh session and closes the old one.
#[tokio::test]
async fn reset_keyword_opens_a_fresh_session() {
    let app = test_app().await;
    let (workspace_id, _) = create_workspace_and_agent(&app).await;

    let (_, first) = call(
        &app,
        "POST",
        "/kernel/sessions/resolve",
        Some(json!({
            "workspace_id": workspace_id,
            "channel": "whatsapp",
            "remote_jid": "+15555550100",
            "user_message": "hello",
        })),
        None,
    )
    .await;
    let first_session = first["session_id"].as_str().unwrap().to_string();

    let (_, continued) = call(
        &app,
        "POST",
        "/kernel/sessions/resolve",
        Some(json!({
            "workspace_id": workspace_id,
            "channel": "whatsapp",
            "remote_jid": "+15555550100",
            "user_message": "how are you",
        })),
        None,
    )
    .await;
    assert_eq!(continued["session_id"], json!(first_session));
    assert_eq!(continued["decision"], json!("continue"));

    let (_, reset) = call(
        &app,
        "POST",
        "/kernel/sessions/resolve",
        Some(json!({
            "workspace_id": workspace_id,
            "channel": "whatsapp",
            "remote_jid": "+15555550100",
            "user_message": "reset",
        })),
        None,
    )
    .await;
    assert_eq!(reset["decision"], json!("explicit_reset"));
    assert_ne!(reset["session_id"], json!(first_session));
}

/// P3: an agent may not request a token on behalf of a subagent it does
/// not own.
#[tokio::test]
async fn agent_cannot_request_token_for_an_unowned_subagent() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    call(
        &app,
        "POST",
        "/kernel/agents",
        Some(json!({ "workspace_id": workspace_id, "agent_id": "intruder", "role": "admin" })),
        None,
    )
    .await;

    let (_, task_body) = call(
        &app,
        "POST",
        "/kernel/tasks",
        Some(json!({
            "workspace_id": workspace_id,
            "created_by_agent_id": agent_id,
            "title": "t",
            "intent": "i",
            "contract": { "objective": "o", "scope": { "allowed_tools": ["web_search"] }, "deliverables": [], "acceptance_checks": [] },
        })),
        None,
    )
    .await;
    let task_id = task_body["task_id"].as_str().unwrap().to_string();

    let (_, spawn_body) = call(
        &app,
        "POST",
        "/kernel/subagents",
        Some(json!({
            "workspace_id": workspace_id,
            "parent_agent_id": agent_id,
            "task_id": task_id,
            "worker_type": "web_researcher",
        })),
        None,
    )
    .await;
    let subagent_id = spawn_body["subagent_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "POST",
        "/kernel/tokens/request",
        Some(json!({
            "workspace_id": workspace_id,
            "requesting_agent_id": "intruder",
            "issue_to": { "kind": "subagent", "id": subagent_id },
            "scope": { "allowed_tools": ["web_search"] },
            "ttl_seconds": 600,
            "task_id": task_id,
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        json!("subagent_not_owned_by_requesting_agent")
    );
}

/// P4: a DCT minted with zero TTL verifies as expired immediately.
#[tokio::test]
async fn zero_ttl_token_is_rejected_as_expired() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    let (_, task_body) = call(
        &app,
        "POST",
        "/kernel/tasks",
        Some(json!({
            "workspace_id": workspace_id,
            "created_by_agent_id": agent_id,
            "title": "t",
            "intent": "i",
            "contract": { "objective": "o", "scope": { "allowed_tools": ["web_search"] }, "deliverables": [], "acceptance_checks": [] },
        })),
        None,
    )
    .await;
    let task_id = task_body["task_id"].as_str().unwrap().to_string();

    let (_, spawn_body) = call(
        &app,
        "POST",
        "/kernel/subagents",
        Some(json!({
            "workspace_id": workspace_id,
            "parent_agent_id": agent_id,
            "task_id": task_id,
            "worker_type": "web_researcher",
        })),
        None,
    )
    .await;
    let subagent_id = spawn_body["subagent_id"].as_str().unwrap().to_string();

    let (_, token_body) = call(
        &app,
        "POST",
        "/kernel/tokens/request",
        Some(json!({
            "workspace_id": workspace_id,
            "requesting_agent_id": agent_id,
            "issue_to": { "kind": "subagent", "id": subagent_id },
            "scope": { "allowed_tools": ["web_search"] },
            "ttl_seconds": 0,
            "task_id": task_id,
        })),
        None,
    )
    .await;
    let bearer = token_body["token"].as_str().unwrap().to_string();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/kernel/subagents/{subagent_id}/run"),
        Some(json!({ "input": {} })),
        Some(&bearer),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("invalid_or_expired_token"));
}

/// P5: an ask-policy action request round-trips through approval,
/// cap-token issuance, and a resubmit that completes it.
#[tokio::test]
async fn approval_round_trip_completes_a_resubmitted_action() {
    let app = test_app().await;
    let (workspace_id, agent_id) = create_workspace_and_agent(&app).await;

    let (status, first) = call(
        &app,
        "POST",
        "/kernel/action_requests",
        Some(json!({
            "workspace_id": workspace_id,
            "agent_id": agent_id,
            "action_type": "send_email",
            "payload": { "to": "ops@example.com" },
            "request_id": "ar_email",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["approval_required"], json!(true));
    let approval_id = first["approval_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "POST",
        &format!("/kernel/approvals/{approval_id}/approve"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, cap) = call(
        &app,
        "POST",
        "/kernel/tokens/issue",
        Some(json!({
            "workspace_id": workspace_id,
            "action_request_id": "ar_email",
            "tool_name": "send_email",
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bearer = cap["token"].as_str().unwrap().to_string();

    let (status, second) = call(
        &app,
        "POST",
        "/kernel/action_requests",
        Some(json!({
            "workspace_id": workspace_id,
            "agent_id": agent_id,
            "action_type": "send_email",
            "payload": { "to": "ops@example.com" },
            "request_id": "ar_email",
        })),
        Some(&bearer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["ok"], json!(true));
    assert_eq!(second["status"], json!("completed"));
}

/// Scenario: connection admin surface exposes both the collection and
/// single-resource forms, never echoing the encrypted secret's plaintext.
#[tokio::test]
async fn connection_get_by_provider_round_trips_and_404s_when_absent() {
    let app = test_app().await;

    let (status, _) = call(
        &app,
        "GET",
        "/kernel/connections/github",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, upserted) = call(
        &app,
        "PUT",
        "/kernel/connections",
        Some(json!({ "provider": "github", "secret": { "token": "ghp_example" } })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upserted["provider"], json!("github"));
    assert!(upserted.get("secret").is_none());
    assert!(upserted.get("encrypted_secret").is_none());

    let (status, fetched) = call(
        &app,
        "GET",
        "/kernel/connections/github",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["provider"], json!("github"));
    assert_eq!(fetched["status"], json!("untested"));
}

/// Scenario: risk-policy admin surface exposes the `/:action` path-param
/// form alongside the body-based one, workspace row beating wildcard.
#[tokio::test]
async fn risk_policy_get_and_set_by_action_path_param() {
    let app = test_app().await;
    let (workspace_id, _) = create_workspace_and_agent(&app).await;

    let (status, seeded) = call(&app, "GET", "/kernel/risk_policies/web_search", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seeded["mode"], json!("auto"));

    let (status, _) = call(&app, "GET", "/kernel/risk_policies/no_such_action", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = call(
        &app,
        "PUT",
        "/kernel/risk_policies/run_shell",
        Some(json!({ "workspace_id": workspace_id, "mode": "block" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["mode"], json!("block"));

    let (status, fetched) = call(
        &app,
        "GET",
        &format!("/kernel/risk_policies/run_shell?workspace_id={workspace_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["mode"], json!("block"));
}
