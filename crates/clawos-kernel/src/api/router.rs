//! API router configuration, grounded on
//! `palm-daemon::api::rest::router::create_router`: one nested `/kernel`
//! prefix, `TraceLayer` + permissive `CorsLayer`, plus the
//! [`inject_elapsed_ms`](super::middleware::inject_elapsed_ms) middleware
//! that stamps every JSON response with its elapsed time.

use super::handlers::{admin, approvals, identity, sessions, subagents, system, tasks, tokens};
use super::middleware::inject_elapsed_ms;
use super::state::AppState;
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let kernel_routes = Router::new()
        .route("/health", get(system::health))
        .route("/setup", post(system::setup))
        .route("/unlock", post(system::unlock))
        .route("/workspaces", post(identity::create_workspace))
        .route("/agents", post(identity::upsert_agent))
        .route("/tasks", post(tasks::create_task))
        .route("/tasks/:id", get(tasks::get_task))
        .route("/tasks/:id/events", get(tasks::list_events))
        .route("/tasks/:id/verify", post(tasks::verify_task))
        .route("/tasks/:id/artifacts", post(tasks::attach_artifact))
        .route("/subagents", post(subagents::spawn_subagent))
        .route("/subagents/:id/run", post(subagents::run_subagent))
        .route("/tokens/request", post(tokens::request_token))
        .route("/tokens/issue", post(tokens::issue_cap_token))
        .route("/tokens/verify", post(tokens::verify_cap_token))
        .route("/dct_approvals/:id/grant", post(tokens::grant_dar))
        .route("/dct_approvals/:id/deny", post(tokens::deny_dar))
        .route("/dct_approvals/:id/extend", post(tokens::extend_dar))
        .route("/action_requests", post(approvals::submit_action_request))
        .route("/approvals/:id/approve", post(approvals::approve))
        .route("/approvals/:id/reject", post(approvals::reject))
        .route("/approvals/:id/extend", post(approvals::extend_approval))
        .route("/sessions/resolve", post(sessions::resolve))
        .route("/sessions/:id", patch(sessions::advance))
        .route(
            "/connections",
            get(admin::list_connections).put(admin::upsert_connection),
        )
        .route(
            "/connections/:provider",
            get(admin::get_connection).delete(admin::delete_connection),
        )
        .route(
            "/risk_policies",
            get(admin::list_risk_policies).put(admin::set_risk_policy),
        )
        .route(
            "/risk_policies/:action",
            get(admin::get_risk_policy).put(admin::set_risk_policy_for_action),
        );

    Router::new()
        .nest("/kernel", kernel_routes)
        .layer(middleware::from_fn(inject_elapsed_ms))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
