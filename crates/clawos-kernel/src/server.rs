//! Server setup and lifecycle, grounded on `palm-daemon::server::Server`:
//! construct backing services once, bind a listener, serve with graceful
//! shutdown.

use crate::action_handlers::default_handlers;
use crate::api::{create_router, AppState};
use crate::config::KernelConfig;
use clawos_approvals::ApprovalService;
use clawos_crypto::{HmacKey, MasterKey};
use clawos_dispatch::{DispatchService, HandlerRegistry};
use clawos_identity::IdentityService;
use clawos_policy::PolicyEngine;
use clawos_session::{SessionConfig, SessionService};
use clawos_store::{ClawStore, InMemoryStore, SqliteStore};
use clawos_tasks::TaskService;
use clawos_tokens::TokenService;
use clawos_types::{MASTER_KEY_STATE_KEY, RECOVERY_HASH_STATE_KEY};
use clawos_worker::{WorkerHandlerRegistry, WorkerService};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    config: KernelConfig,
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
}

impl Server {
    pub async fn new(config: KernelConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ClawStore> = match &config.storage.db_path {
            Some(path) => Arc::new(SqliteStore::connect(path).await?),
            None => Arc::new(InMemoryStore::new()),
        };

        let master_key = match store.get_state(MASTER_KEY_STATE_KEY).await? {
            Some(hex) => MasterKey::from_hex(&hex)?,
            None => {
                let key = MasterKey::generate();
                store.set_state(MASTER_KEY_STATE_KEY, &key.to_hex()).await?;
                key
            }
        };

        let recovery_hash = store.get_state(RECOVERY_HASH_STATE_KEY).await?;
        let unlocked_at_boot = recovery_hash.is_none();
        let hmac_key = HmacKey::from_recovery_hash(recovery_hash.as_deref());

        let identity = Arc::new(IdentityService::new(store.clone()));
        let policy = Arc::new(PolicyEngine::new(store.clone()));
        policy.seed_defaults_if_absent().await?;
        let tokens = Arc::new(TokenService::new(store.clone(), hmac_key.clone()));
        tokens.purge_expired().await?;
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
        let sessions = Arc::new(SessionService::new(
            store.clone(),
            SessionConfig {
                timeout_minutes: config.session.timeout_minutes,
                enable_topic_drift_classifier: config.session.enable_drift_classifier,
            },
        ));

        Ok(Self {
            config,
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
            unlocked_at_boot,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.server.port);
        let listener = TcpListener::bind(&addr).await?;

        let state = AppState::new(
            self.store,
            self.identity,
            self.policy,
            self.tokens,
            self.approvals,
            self.dispatch,
            self.worker,
            self.tasks,
            self.sessions,
            self.master_key,
            self.unlocked_at_boot,
        );
        let app = create_router(state);

        tracing::info!("clawos kernel listening on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("clawos kernel shutting down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
