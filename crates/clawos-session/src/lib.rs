//! Session resolution decision chain and cognitive objective tracking
//! (`spec.md` §4.9).
//!
//! Grounded on `aas-policy`'s priority-ordered rule evaluation,
//! restructured here as a fixed chain of named steps rather than a
//! scored rule set — each step either fires or falls through to the
//! next, the order itself being the "priority".

mod error;

pub use error::SessionError;

use chrono::{DateTime, Duration, Utc};
use clawos_store::ClawStore;
use clawos_types::{
    CognitiveObjective, ObjectiveId, ObjectiveStatus, ObjectiveTurn, RequiredDeliverable, Session,
    SessionId, SessionResolveReason, SessionStatus, ToolEvidence, WorkspaceId,
    CONTEXT_SUMMARY_CAP,
};
use serde_json::Value;
use std::sync::Arc;

/// Case-insensitive, trimmed matches that trigger `explicit_reset`.
const RESET_KEYWORDS: &[&str] = &["reset", "/reset", "start over"];

pub struct SessionConfig {
    pub timeout_minutes: i64,
    pub enable_topic_drift_classifier: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 30,
            enable_topic_drift_classifier: false,
        }
    }
}

pub struct SessionService {
    store: Arc<dyn ClawStore>,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(store: Arc<dyn ClawStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    fn is_reset_keyword(message: &str) -> bool {
        let normalized = message.trim().to_lowercase();
        RESET_KEYWORDS.contains(&normalized.as_str())
    }

    async fn open_new_session(
        &self,
        workspace_id: &WorkspaceId,
        channel: &str,
        remote_jid: &str,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();
        let session = Session {
            session_id: SessionId::new(),
            workspace_id: workspace_id.clone(),
            channel: channel.to_string(),
            remote_jid: remote_jid.to_string(),
            status: SessionStatus::Active,
            turn_count: 0,
            context_summary: String::new(),
            created_at: now,
            last_message_at: now,
        };
        Ok(self.store.create_session(session).await?)
    }

    async fn close(&self, mut session: Session) -> Result<(), SessionError> {
        session.status = SessionStatus::Closed;
        self.store.update_session(session).await?;
        Ok(())
    }

    /// Runs the fixed decision chain and returns the resolved session
    /// plus the reason it was chosen.
    pub async fn resolve(
        &self,
        workspace_id: &WorkspaceId,
        channel: &str,
        remote_jid: &str,
        user_message: &str,
        topic_drift_score: Option<f64>,
    ) -> Result<(Session, SessionResolveReason), SessionError> {
        let latest = self
            .store
            .find_latest_session(workspace_id, channel, remote_jid)
            .await?;

        if Self::is_reset_keyword(user_message) {
            if let Some(current) = latest {
                if current.status == SessionStatus::Active {
                    self.close(current).await?;
                }
            }
            let session = self.open_new_session(workspace_id, channel, remote_jid).await?;
            return Ok((session, SessionResolveReason::ExplicitReset));
        }

        let latest = match latest {
            Some(session) => session,
            None => {
                let session = self.open_new_session(workspace_id, channel, remote_jid).await?;
                return Ok((session, SessionResolveReason::NoSession));
            }
        };

        if latest.status == SessionStatus::Closed {
            let session = self.open_new_session(workspace_id, channel, remote_jid).await?;
            return Ok((session, SessionResolveReason::SessionClosed));
        }

        let timed_out = Utc::now() - latest.last_message_at
            > Duration::minutes(self.config.timeout_minutes);
        if timed_out {
            self.close(latest).await?;
            let session = self.open_new_session(workspace_id, channel, remote_jid).await?;
            return Ok((session, SessionResolveReason::Timeout));
        }

        if self.config.enable_topic_drift_classifier {
            if let Some(score) = topic_drift_score {
                if score >= 0.80 {
                    self.close(latest).await?;
                    let session =
                        self.open_new_session(workspace_id, channel, remote_jid).await?;
                    return Ok((session, SessionResolveReason::TopicDrift));
                }
            }
        }

        Ok((latest, SessionResolveReason::Continue))
    }

    /// Increments `turn_count`, bumps `last_message_at`, and stores
    /// `context_summary` truncated to [`CONTEXT_SUMMARY_CAP`] chars.
    pub async fn advance(
        &self,
        session_id: &SessionId,
        context_summary: String,
    ) -> Result<Session, SessionError> {
        let mut session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(SessionError::SessionNotFound)?;
        session.turn_count += 1;
        session.last_message_at = Utc::now();
        session.context_summary = truncate_chars(&context_summary, CONTEXT_SUMMARY_CAP);
        Ok(self.store.update_session(session).await?)
    }

    /// Continues the session's active objective, or starts a fresh one
    /// when none is in progress.
    pub async fn resolve_objective(
        &self,
        session_id: &SessionId,
        goal: String,
        required_deliverable: RequiredDeliverable,
    ) -> Result<CognitiveObjective, SessionError> {
        if let Some(existing) = self.store.find_latest_objective_for_session(session_id).await? {
            if existing.status == ObjectiveStatus::InProgress {
                return Ok(existing);
            }
        }
        let objective = CognitiveObjective {
            objective_id: ObjectiveId::new(),
            session_id: session_id.clone(),
            goal,
            required_deliverable,
            status: ObjectiveStatus::InProgress,
            created_at: Utc::now(),
            tool_evidence: Vec::new(),
            turns: Vec::new(),
        };
        Ok(self.store.create_objective(objective).await?)
    }

    pub async fn append_tool_evidence(
        &self,
        objective_id: &ObjectiveId,
        tool_name: String,
        summary: String,
        called_at: DateTime<Utc>,
    ) -> Result<CognitiveObjective, SessionError> {
        let mut objective = self
            .store
            .get_objective(objective_id)
            .await?
            .ok_or(SessionError::ObjectiveNotFound)?;
        objective.tool_evidence.push(ToolEvidence {
            tool_name,
            called_at,
            summary,
        });
        Ok(self.store.update_objective(objective).await?)
    }

    pub async fn append_turn(
        &self,
        objective_id: &ObjectiveId,
        role: String,
        content: Value,
    ) -> Result<CognitiveObjective, SessionError> {
        let mut objective = self
            .store
            .get_objective(objective_id)
            .await?
            .ok_or(SessionError::ObjectiveNotFound)?;
        objective.turns.push(ObjectiveTurn {
            at: Utc::now(),
            role,
            content,
        });
        Ok(self.store.update_objective(objective).await?)
    }

    pub async fn set_objective_status(
        &self,
        objective_id: &ObjectiveId,
        status: ObjectiveStatus,
    ) -> Result<CognitiveObjective, SessionError> {
        let mut objective = self
            .store
            .get_objective(objective_id)
            .await?
            .ok_or(SessionError::ObjectiveNotFound)?;
        objective.status = status;
        Ok(self.store.update_objective(objective).await?)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawos_store::InMemoryStore;
    use clawos_types::DeliverableType;

    fn service_with(config: SessionConfig) -> (SessionService, WorkspaceId) {
        let store: Arc<dyn ClawStore> = Arc::new(InMemoryStore::new());
        (SessionService::new(store, config), WorkspaceId::new())
    }

    #[tokio::test]
    async fn no_session_then_continue_within_timeout() {
        let (service, workspace_id) = service_with(SessionConfig::default());
        let (first, reason) = service
            .resolve(&workspace_id, "whatsapp", "+1555", "hi", None)
            .await
            .unwrap();
        assert_eq!(reason, SessionResolveReason::NoSession);

        let (second, reason) = service
            .resolve(&workspace_id, "whatsapp", "+1555", "how are you", None)
            .await
            .unwrap();
        assert_eq!(reason, SessionResolveReason::Continue);
        assert_eq!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn reset_keyword_closes_old_and_opens_new() {
        let (service, workspace_id) = service_with(SessionConfig::default());
        let (first, _) = service
            .resolve(&workspace_id, "whatsapp", "+1555", "hi", None)
            .await
            .unwrap();

        let (second, reason) = service
            .resolve(&workspace_id, "whatsapp", "+1555", "reset", None)
            .await
            .unwrap();
        assert_eq!(reason, SessionResolveReason::ExplicitReset);
        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn advance_truncates_context_summary() {
        let (service, workspace_id) = service_with(SessionConfig::default());
        let (session, _) = service
            .resolve(&workspace_id, "whatsapp", "+1555", "hi", None)
            .await
            .unwrap();
        let long = "x".repeat(CONTEXT_SUMMARY_CAP + 500);
        let advanced = service.advance(&session.session_id, long).await.unwrap();
        assert_eq!(advanced.context_summary.len(), CONTEXT_SUMMARY_CAP);
        assert_eq!(advanced.turn_count, 1);
    }

    #[tokio::test]
    async fn objective_resolution_continues_while_in_progress() {
        let (service, workspace_id) = service_with(SessionConfig::default());
        let (session, _) = service
            .resolve(&workspace_id, "whatsapp", "+1555", "hi", None)
            .await
            .unwrap();

        let deliverable = RequiredDeliverable {
            deliverable_type: DeliverableType::Answer,
            count: None,
            description: "answer the question".into(),
            item_format: None,
        };
        let first = service
            .resolve_objective(&session.session_id, "goal".into(), deliverable.clone())
            .await
            .unwrap();
        let second = service
            .resolve_objective(&session.session_id, "different goal".into(), deliverable)
            .await
            .unwrap();
        assert_eq!(first.objective_id, second.objective_id);
    }
}
