//! Worker handler contract, looked up by `worker_type` with a fixed
//! `"default"` fallback — `spec.md` §4.7 step 3.

use async_trait::async_trait;
use clawos_dispatch::DispatchService;
use clawos_types::{Dct, Subagent};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct WorkerContext {
    pub subagent: Subagent,
    pub dct: Dct,
    pub dispatch: Arc<DispatchService>,
}

#[async_trait]
pub trait WorkerHandler: Send + Sync {
    async fn run(&self, input: Value, ctx: &WorkerContext) -> Result<Value, String>;
}

/// Echoes the input back as the artifact content. Always registered under
/// `"default"`, overridable by passing another handler at construction.
pub struct EchoWorkerHandler;

#[async_trait]
impl WorkerHandler for EchoWorkerHandler {
    async fn run(&self, input: Value, _ctx: &WorkerContext) -> Result<Value, String> {
        Ok(input)
    }
}

pub struct WorkerHandlerRegistry {
    handlers: HashMap<String, Arc<dyn WorkerHandler>>,
}

impl WorkerHandlerRegistry {
    pub fn new(handlers: Vec<(&str, Arc<dyn WorkerHandler>)>) -> Self {
        let mut handlers: HashMap<String, Arc<dyn WorkerHandler>> = handlers
            .into_iter()
            .map(|(name, handler)| (name.to_string(), handler))
            .collect();
        handlers
            .entry("default".to_string())
            .or_insert_with(|| Arc::new(EchoWorkerHandler));
        Self { handlers }
    }

    /// Falls back to `"default"` when `worker_type` has no registered
    /// handler, never to a missing-handler error.
    pub fn resolve(&self, worker_type: &str) -> Arc<dyn WorkerHandler> {
        self.handlers
            .get(worker_type)
            .or_else(|| self.handlers.get("default"))
            .expect("\"default\" handler always registered")
            .clone()
    }
}
