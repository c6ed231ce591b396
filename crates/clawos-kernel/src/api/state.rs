//! Shared application state, grounded on `palm-daemon::api::rest::state::AppState`:
//! one `Clone`-able struct of `Arc`s handed to every handler via
//! `axum::extract::State`.

use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use clawos_approvals::ApprovalService;
use clawos_crypto::MasterKey;
use clawos_dispatch::DispatchService;
use clawos_identity::IdentityService;
use clawos_policy::PolicyEngine;
use clawos_session::SessionService;
use clawos_store::ClawStore;
use clawos_tasks::TaskService;
use clawos_tokens::TokenService;
use clawos_worker::WorkerService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClawStore>,
    pub identity: Arc<IdentityService>,
    pub policy: Arc<PolicyEngine>,
    pub tokens: Arc<TokenService>,
    pub approvals: Arc<ApprovalService>,
    pub dispatch: Arc<DispatchService>,
    pub worker: Arc<WorkerService>,
    pub tasks: Arc<TaskService>,
    pub sessions: Arc<SessionService>,
    pub master_key: MasterKey,
    pub version: String,
    pub started_at: DateTime<Utc>,
    unlocked: Arc<AtomicBool>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ClawStore>,
        identity: Arc<IdentityService>,
        policy: Arc<PolicyEngine>,
        tokens: Arc<TokenService>,
        approvals: Arc<ApprovalService>,
        dispatch: Arc<DispatchService>,
        worker: Arc<WorkerService>,
        tasks: Arc<TaskService>,
        sessions: Arc<SessionService>,
        master_key: MasterKey,
        unlocked_at_boot: bool,
    ) -> Self {
        Self {
            store,
            identity,
            policy,
            tokens,
            approvals,
            dispatch,
            worker,
            tasks,
            sessions,
            master_key,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
            unlocked: Arc::new(AtomicBool::new(unlocked_at_boot)),
        }
    }

    pub fn uptime(&self) -> String {
        let elapsed = Utc::now() - self.started_at;
        format!("{}s", elapsed.num_seconds().max(0))
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    pub fn set_unlocked(&self, value: bool) {
        self.unlocked.store(value, Ordering::SeqCst);
    }

    /// Every handler but `/kernel/setup`, `/kernel/unlock`, and
    /// `/kernel/health` calls this first.
    pub fn assert_unlocked(&self) -> ApiResult<()> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(ApiError::KernelLocked)
        }
    }
}
