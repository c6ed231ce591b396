//! The two approval lifecycles (`spec.md` §4.6): action-level approvals
//! tied to one action request, and DCT approval requests (DARs) tied to
//! one pending token mint. Also owns action-level cap-token issuance and
//! verification, since a cap token is simply the artifact of a decided
//! approval.
//!
//! Grounded on `aas-ledger`'s create-then-decide lifecycle pattern
//! (terminal decisions, idempotent re-reads) generalized to two parallel
//! entities instead of one commitment type.

mod error;

pub use error::ApprovalError;

use chrono::{Duration, Utc};
use clawos_crypto::HmacKey;
use clawos_store::ClawStore;
use clawos_types::{
    AgentId, Approval, ApprovalId, ApprovalStatus, ActionRequestId, CapToken, DarId, DarStatus,
    DctApprovalRequest, PrincipalKind, RiskLevel, ScopeSpec, TokenId, WorkspaceId,
};
use std::sync::Arc;

/// Default TTL for both approval kinds, per `spec.md` §4.6.
pub const DEFAULT_TTL_SECONDS: u64 = 600;
/// Hard ceiling on TTL (and on `extend_ttl`'s resulting TTL), per §4.6
/// and this kernel's resolution of the TTL-refresh Open Question.
pub const MAX_TTL_SECONDS: u64 = 3600;

pub struct ApprovalService {
    store: Arc<dyn ClawStore>,
    hmac_key: HmacKey,
}

impl ApprovalService {
    pub fn new(store: Arc<dyn ClawStore>, hmac_key: HmacKey) -> Self {
        Self { store, hmac_key }
    }

    fn clamp_ttl(ttl_seconds: Option<u64>) -> u64 {
        ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS).min(MAX_TTL_SECONDS)
    }

    // ---- action-level approvals ----------------------------------------

    pub async fn create_approval(
        &self,
        workspace_id: WorkspaceId,
        action_request_id: ActionRequestId,
        requested_by: AgentId,
        ttl_seconds: Option<u64>,
    ) -> Result<Approval, ApprovalError> {
        let now = Utc::now();
        let approval = Approval {
            approval_id: ApprovalId::new(),
            workspace_id,
            action_request_id,
            requested_by,
            status: ApprovalStatus::Pending,
            expires_at: now + Duration::seconds(Self::clamp_ttl(ttl_seconds) as i64),
            decision_reason: None,
            decided_at: None,
        };
        Ok(self.store.create_approval(approval).await?)
    }

    /// Reads the row and, if it is pending but past `expires_at`, reports
    /// it as denied without writing — decisions stay terminal and no
    /// re-open is ever performed.
    pub async fn get_approval(&self, id: &ApprovalId) -> Result<Approval, ApprovalError> {
        let mut approval = self
            .store
            .get_approval(id)
            .await?
            .ok_or(ApprovalError::ApprovalNotFound)?;
        approval.status = approval.effective_status(Utc::now());
        Ok(approval)
    }

    pub async fn decide_approval(
        &self,
        id: &ApprovalId,
        approve: bool,
        reason: Option<String>,
    ) -> Result<Approval, ApprovalError> {
        let mut approval = self
            .store
            .get_approval(id)
            .await?
            .ok_or(ApprovalError::ApprovalNotFound)?;

        if approval.status != ApprovalStatus::Pending {
            return Err(ApprovalError::AlreadyDecided);
        }

        approval.status = if approve {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        approval.decision_reason = reason;
        approval.decided_at = Some(Utc::now());
        Ok(self.store.update_approval(approval).await?)
    }

    /// Pushes `expires_at` forward by `extend_seconds`, capped so the
    /// resulting TTL from now never exceeds [`MAX_TTL_SECONDS`]. Only
    /// valid while the approval is still pending and unexpired.
    pub async fn extend_approval_ttl(
        &self,
        id: &ApprovalId,
        extend_seconds: u64,
    ) -> Result<Approval, ApprovalError> {
        let mut approval = self
            .store
            .get_approval(id)
            .await?
            .ok_or(ApprovalError::ApprovalNotFound)?;
        let now = Utc::now();
        if approval.status != ApprovalStatus::Pending || approval.is_expired(now) {
            return Err(ApprovalError::NotExtendable);
        }
        let requested = approval.expires_at + Duration::seconds(extend_seconds as i64);
        let ceiling = now + Duration::seconds(MAX_TTL_SECONDS as i64);
        approval.expires_at = requested.min(ceiling);
        Ok(self.store.update_approval(approval).await?)
    }

    // ---- cap tokens ------------------------------------------------------

    /// Mints the action-level bearer bound to `(workspace,
    /// action_request_id, tool_name)` after an approval decision.
    pub async fn issue_cap_token(
        &self,
        workspace_id: WorkspaceId,
        action_request_id: ActionRequestId,
        tool_name: String,
        ttl_seconds: Option<u64>,
    ) -> Result<(CapToken, String), ApprovalError> {
        let now = Utc::now();
        let token_id = TokenId::generate("cap_");
        let token = CapToken {
            token_id: token_id.clone(),
            workspace_id,
            action_request_id,
            tool_name,
            expires_at: now + Duration::seconds(Self::clamp_ttl(ttl_seconds) as i64),
            created_at: now,
        };
        let stored = self.store.create_cap_token(token).await?;
        let sig = clawos_crypto::sign(&self.hmac_key, stored.token_id.as_str());
        let bearer = format!("{}.{}", stored.token_id.as_str(), sig);
        Ok((stored, bearer))
    }

    /// Parses `"id.sig"`, HMAC-verifies, and requires the stored token to
    /// match `workspace_id`, `action_request_id`, and `tool_name ==
    /// action_type` with `expires_at > now`. Any failure is reported as
    /// "missing approval" by the caller — this method only distinguishes
    /// internally for logging.
    pub async fn verify_cap_token(
        &self,
        bearer: &str,
        workspace_id: &WorkspaceId,
        action_request_id: &ActionRequestId,
        action_type: &str,
    ) -> Result<CapToken, ApprovalError> {
        let token_id =
            clawos_crypto::verify(&self.hmac_key, bearer).map_err(|_| ApprovalError::BadCapToken)?;
        let token = self
            .store
            .get_cap_token(&TokenId::from_string(token_id))
            .await?
            .ok_or(ApprovalError::BadCapToken)?;

        if &token.workspace_id != workspace_id {
            return Err(ApprovalError::BadCapToken);
        }
        if &token.action_request_id != action_request_id {
            return Err(ApprovalError::BadCapToken);
        }
        if token.tool_name != action_type {
            return Err(ApprovalError::BadCapToken);
        }
        if token.is_expired(Utc::now()) {
            return Err(ApprovalError::BadCapToken);
        }
        Ok(token)
    }

    // ---- DCT approval requests (DARs) ------------------------------------

    pub async fn create_dar(
        &self,
        workspace_id: WorkspaceId,
        requested_by_agent_id: AgentId,
        issue_to_kind: PrincipalKind,
        issue_to_id: String,
        scope: ScopeSpec,
        ttl_seconds: u64,
        risk_level: RiskLevel,
    ) -> Result<DctApprovalRequest, ApprovalError> {
        let now = Utc::now();
        let dar = DctApprovalRequest {
            dar_id: DarId::new(),
            workspace_id,
            requested_by_agent_id,
            issue_to_kind,
            issue_to_id,
            scope,
            ttl_seconds,
            risk_level,
            status: DarStatus::Pending,
            expires_at: now + Duration::seconds(DEFAULT_TTL_SECONDS as i64),
            created_at: now,
            decided_at: None,
        };
        Ok(self.store.create_dar(dar).await?)
    }

    pub async fn get_dar(&self, id: &DarId) -> Result<DctApprovalRequest, ApprovalError> {
        self.store
            .get_dar(id)
            .await?
            .ok_or(ApprovalError::DarNotFound)
    }

    pub async fn decide_dar(
        &self,
        id: &DarId,
        grant: bool,
    ) -> Result<DctApprovalRequest, ApprovalError> {
        let mut dar = self.get_dar(id).await?;
        if dar.status != DarStatus::Pending {
            return Err(ApprovalError::AlreadyDecided);
        }
        dar.status = if grant {
            DarStatus::Granted
        } else {
            DarStatus::Denied
        };
        dar.decided_at = Some(Utc::now());
        Ok(self.store.update_dar(dar).await?)
    }

    pub async fn extend_dar_ttl(
        &self,
        id: &DarId,
        extend_seconds: u64,
    ) -> Result<DctApprovalRequest, ApprovalError> {
        let mut dar = self.get_dar(id).await?;
        let now = Utc::now();
        if dar.status != DarStatus::Pending || dar.is_expired(now) {
            return Err(ApprovalError::NotExtendable);
        }
        let requested = dar.expires_at + Duration::seconds(extend_seconds as i64);
        let ceiling = now + Duration::seconds(MAX_TTL_SECONDS as i64);
        dar.expires_at = requested.min(ceiling);
        Ok(self.store.update_dar(dar).await?)
    }

    /// Re-validates a DAR immediately before minting: must be granted,
    /// unexpired, and requested by the same agent now re-invoking
    /// `tokens/request`.
    pub async fn validate_dar_for_mint(
        &self,
        id: &DarId,
        requesting_agent: &AgentId,
    ) -> Result<DctApprovalRequest, ApprovalError> {
        let dar = self.get_dar(id).await?;
        if &dar.requested_by_agent_id != requesting_agent {
            return Err(ApprovalError::WorkspaceMismatch);
        }
        match dar.status {
            DarStatus::Denied => return Err(ApprovalError::DarDenied),
            DarStatus::Pending => return Err(ApprovalError::DarDenied),
            DarStatus::Granted => {}
        }
        if dar.is_expired(Utc::now()) {
            return Err(ApprovalError::DarExpired);
        }
        Ok(dar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawos_store::InMemoryStore;

    fn service() -> ApprovalService {
        let store: Arc<dyn ClawStore> = Arc::new(InMemoryStore::new());
        ApprovalService::new(store, HmacKey::dev())
    }

    #[tokio::test]
    async fn approval_decision_is_terminal() {
        let service = service();
        let approval = service
            .create_approval(
                WorkspaceId::new(),
                ActionRequestId::new(),
                AgentId::from("orchestrator"),
                None,
            )
            .await
            .unwrap();
        service
            .decide_approval(&approval.approval_id, true, None)
            .await
            .unwrap();
        let err = service
            .decide_approval(&approval.approval_id, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyDecided));
    }

    #[tokio::test]
    async fn cap_token_round_trips_and_rejects_wrong_binding() {
        let service = service();
        let workspace_id = WorkspaceId::new();
        let action_request_id = ActionRequestId::new();
        let (_, bearer) = service
            .issue_cap_token(
                workspace_id.clone(),
                action_request_id.clone(),
                "run_shell".into(),
                None,
            )
            .await
            .unwrap();

        let verified = service
            .verify_cap_token(&bearer, &workspace_id, &action_request_id, "run_shell")
            .await
            .unwrap();
        assert_eq!(verified.tool_name, "run_shell");

        let wrong_tool = service
            .verify_cap_token(&bearer, &workspace_id, &action_request_id, "send_email")
            .await;
        assert!(wrong_tool.is_err());
    }

    #[tokio::test]
    async fn dar_validate_for_mint_rejects_a_different_requester() {
        let service = service();
        let requester = AgentId::from("orchestrator");
        let dar = service
            .create_dar(
                WorkspaceId::new(),
                requester.clone(),
                PrincipalKind::Subagent,
                "sub-1".into(),
                ScopeSpec::new(vec!["run_shell".into()]),
                600,
                RiskLevel::High,
            )
            .await
            .unwrap();
        service.decide_dar(&dar.dar_id, true).await.unwrap();

        let other = AgentId::from("someone_else");
        let err = service
            .validate_dar_for_mint(&dar.dar_id, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::WorkspaceMismatch));

        let ok = service
            .validate_dar_for_mint(&dar.dar_id, &requester)
            .await
            .unwrap();
        assert_eq!(ok.status, DarStatus::Granted);
    }
}
