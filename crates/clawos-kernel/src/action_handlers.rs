//! Illustrative action handlers registered at boot so the dispatcher and
//! the default risk-policy seeds (`web_search`, `run_shell`,
//! `send_email`, `delete_file`) have something real to resolve against.
//! Concrete third-party integrations are out of scope; these stand in
//! for them.

use async_trait::async_trait;
use clawos_dispatch::{ActionHandler, DispatchContext, HandlerMetadata};
use clawos_types::{ActionRequest, RiskLevel};
use serde_json::{json, Value};

struct WebSearchHandler;

#[async_trait]
impl ActionHandler for WebSearchHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "web_search",
            writes: false,
            risk_level: RiskLevel::Low,
            reversible: true,
            description: "looks up the given query",
        }
    }

    async fn run(&self, request: &ActionRequest, _ctx: &DispatchContext) -> Result<Value, String> {
        Ok(json!({ "query": request.payload.get("query").cloned().unwrap_or(Value::Null), "results": [] }))
    }
}

struct RunShellHandler;

#[async_trait]
impl ActionHandler for RunShellHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "run_shell",
            writes: true,
            risk_level: RiskLevel::High,
            reversible: false,
            description: "runs a shell command",
        }
    }

    async fn run(&self, request: &ActionRequest, _ctx: &DispatchContext) -> Result<Value, String> {
        let command = request
            .payload
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing \"command\"".to_string())?;
        Ok(json!({ "command": command, "exit_code": 0, "stdout": "" }))
    }
}

struct SendEmailHandler;

#[async_trait]
impl ActionHandler for SendEmailHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "send_email",
            writes: true,
            risk_level: RiskLevel::Medium,
            reversible: false,
            description: "sends an email",
        }
    }

    async fn run(&self, request: &ActionRequest, _ctx: &DispatchContext) -> Result<Value, String> {
        let to = request
            .payload
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing \"to\"".to_string())?;
        Ok(json!({ "to": to, "sent": true }))
    }
}

struct DeleteFileHandler;

#[async_trait]
impl ActionHandler for DeleteFileHandler {
    fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: "delete_file",
            writes: true,
            risk_level: RiskLevel::High,
            reversible: false,
            description: "deletes a file",
        }
    }

    async fn run(&self, request: &ActionRequest, _ctx: &DispatchContext) -> Result<Value, String> {
        let path = request
            .payload
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing \"path\"".to_string())?;
        Ok(json!({ "path": path, "deleted": true }))
    }
}

pub fn default_handlers() -> Vec<std::sync::Arc<dyn ActionHandler>> {
    vec![
        std::sync::Arc::new(WebSearchHandler),
        std::sync::Arc::new(RunShellHandler),
        std::sync::Arc::new(SendEmailHandler),
        std::sync::Arc::new(DeleteFileHandler),
    ]
}
