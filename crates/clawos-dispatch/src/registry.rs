//! Action handler contract and the startup-built lookup table. New
//! handlers require a code change and a new registry entry — runtime
//! registration is out of scope, per `spec.md` §4.5.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clawos_types::{ActionRequest, RiskLevel};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct HandlerMetadata {
    pub name: &'static str,
    pub writes: bool,
    pub risk_level: RiskLevel,
    pub reversible: bool,
    pub description: &'static str,
}

pub struct DispatchContext {
    pub started_at: DateTime<Utc>,
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn metadata(&self) -> HandlerMetadata;

    /// Runs the action. Returning `Err` fails the action request with the
    /// given message as its persisted result; handlers never panic on
    /// expected failure modes.
    async fn run(&self, request: &ActionRequest, ctx: &DispatchContext) -> Result<Value, String>;
}

pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn ActionHandler>>) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|h| (h.metadata().name, h))
            .collect();
        Self { handlers }
    }

    pub fn get(&self, action_type: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(action_type).cloned()
    }
}
