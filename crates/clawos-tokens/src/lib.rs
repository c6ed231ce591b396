//! Mints, verifies, and revokes Delegation Capability Tokens.
//!
//! Grounded on `aas-ledger`'s verify-then-transition pattern (read the
//! row, check its expected state, flip it) generalized to bearer-token
//! lifecycle instead of commitment lifecycle, signed via `clawos_crypto`.

mod error;

pub use error::TokenError;

use chrono::{Duration, Utc};
use clawos_crypto::HmacKey;
use clawos_store::ClawStore;
use clawos_types::{AgentId, Dct, PrincipalKind, ScopeSpec, TaskId, TokenId, WorkspaceId};
use std::sync::Arc;

pub struct TokenService {
    store: Arc<dyn ClawStore>,
    hmac_key: HmacKey,
}

/// Caller-supplied authority the attenuation check validates against.
/// For a subagent-kind mint, this is resolved by the caller from the
/// parent agent's currently active grants; `spec.md`'s "parent agent's
/// current authority" is not broken out as its own entity, so this
/// kernel resolves it from the task contract's scope — see `DESIGN.md`.
pub struct MintRequest {
    pub workspace_id: WorkspaceId,
    pub issued_to_kind: PrincipalKind,
    pub issued_to_id: String,
    pub parent_agent_id: Option<AgentId>,
    pub task_id: Option<TaskId>,
    pub scope: ScopeSpec,
    pub ttl_seconds: u64,
}

impl TokenService {
    pub fn new(store: Arc<dyn ClawStore>, hmac_key: HmacKey) -> Self {
        Self { store, hmac_key }
    }

    /// Mints a bearer DCT. Fails closed (never silently narrows the
    /// scope) when a subagent-kind token's requested scope exceeds
    /// `parent_authority`, and equally fails closed when no
    /// `parent_authority` could be resolved at all — attenuation is a
    /// hard invariant, never a skipped check.
    pub async fn mint_dct(
        &self,
        request: MintRequest,
        parent_authority: Option<&ScopeSpec>,
    ) -> Result<(Dct, String), TokenError> {
        if request.issued_to_kind == PrincipalKind::Subagent && request.parent_agent_id.is_none() {
            return Err(TokenError::MissingParentForSubagent);
        }

        if request.issued_to_kind == PrincipalKind::Subagent {
            let parent_scope = parent_authority.ok_or(TokenError::MissingParentAuthority)?;
            if !request.scope.is_subset_of(parent_scope) {
                return Err(TokenError::ScopeExceedsParentAuthority);
            }
        }

        let now = Utc::now();
        let prefix = match request.issued_to_kind {
            PrincipalKind::Agent => "dct_",
            PrincipalKind::Subagent => "dct_",
        };
        let token_id = TokenId::generate(prefix);

        let dct = Dct {
            token_id: token_id.clone(),
            workspace_id: request.workspace_id,
            issued_to_kind: request.issued_to_kind,
            issued_to_id: request.issued_to_id,
            parent_agent_id: request.parent_agent_id,
            task_id: request.task_id,
            scope: request.scope,
            ttl_seconds: request.ttl_seconds,
            expires_at: now + Duration::seconds(request.ttl_seconds as i64),
            revoked: false,
            created_at: now,
        };
        let stored = self.store.insert_dct(dct).await?;
        let bearer = self.bearer_for(&stored.token_id);
        tracing::info!(token_id = %stored.token_id, "dct minted");
        Ok((stored, bearer))
    }

    fn bearer_for(&self, token_id: &TokenId) -> String {
        let sig = clawos_crypto::sign(&self.hmac_key, token_id.as_str());
        format!("{}.{}", token_id.as_str(), sig)
    }

    /// Re-reads the row on every call so revocation is immediate. Any
    /// failure (bad format, bad signature, missing row, revoked,
    /// expired) is reported as a distinct variant but callers should
    /// treat all of them as "no valid token" without distinguishing on
    /// the wire, per the crypto failure non-disclosure requirement.
    pub async fn verify_dct(&self, bearer: &str) -> Result<Dct, TokenError> {
        let token_id = clawos_crypto::verify(&self.hmac_key, bearer)
            .map_err(|_| TokenError::InvalidSignature)?;

        let dct = self
            .store
            .get_dct(&TokenId::from_string(token_id))
            .await?
            .ok_or(TokenError::NotFound)?;

        if dct.revoked {
            return Err(TokenError::Revoked);
        }
        if dct.is_expired(Utc::now()) {
            return Err(TokenError::Expired);
        }
        Ok(dct)
    }

    /// Idempotent: revoking an already-revoked token succeeds silently.
    pub async fn revoke_dct(&self, token_id: &TokenId) -> Result<(), TokenError> {
        if let Some(mut dct) = self.store.get_dct(token_id).await? {
            if !dct.revoked {
                dct.revoked = true;
                self.store.update_dct(dct).await?;
            }
        }
        Ok(())
    }

    /// Run once at startup: deletes every token whose `expires_at` has
    /// already passed.
    pub async fn purge_expired(&self) -> Result<u64, TokenError> {
        Ok(self.store.delete_expired_dcts(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawos_store::InMemoryStore;

    fn service() -> TokenService {
        let store: Arc<dyn ClawStore> = Arc::new(InMemoryStore::new());
        TokenService::new(store, HmacKey::dev())
    }

    fn base_request(kind: PrincipalKind, scope: Vec<&str>) -> MintRequest {
        MintRequest {
            workspace_id: WorkspaceId::new(),
            issued_to_kind: kind,
            issued_to_id: "sub-1".into(),
            parent_agent_id: Some(AgentId::from("orchestrator")),
            task_id: Some(TaskId::new()),
            scope: ScopeSpec::new(scope.into_iter().map(String::from).collect()),
            ttl_seconds: 600,
        }
    }

    #[tokio::test]
    async fn subagent_mint_without_parent_is_rejected() {
        let service = service();
        let mut request = base_request(PrincipalKind::Subagent, vec!["web_search"]);
        request.parent_agent_id = None;
        let err = service.mint_dct(request, None).await.unwrap_err();
        assert!(matches!(err, TokenError::MissingParentForSubagent));
    }

    #[tokio::test]
    async fn subagent_mint_without_resolved_parent_authority_is_rejected() {
        let service = service();
        let request = base_request(PrincipalKind::Subagent, vec!["web_search"]);
        let err = service.mint_dct(request, None).await.unwrap_err();
        assert!(matches!(err, TokenError::MissingParentAuthority));
    }

    #[tokio::test]
    async fn subagent_scope_cannot_exceed_parent_authority() {
        let service = service();
        let request = base_request(PrincipalKind::Subagent, vec!["run_shell"]);
        let parent_authority = ScopeSpec::new(vec!["web_search".into()]);
        let err = service
            .mint_dct(request, Some(&parent_authority))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::ScopeExceedsParentAuthority));
    }

    #[tokio::test]
    async fn minted_token_verifies_and_tampered_signature_fails() {
        let service = service();
        let request = base_request(PrincipalKind::Agent, vec!["web_search"]);
        let (dct, bearer) = service.mint_dct(request, None).await.unwrap();

        let verified = service.verify_dct(&bearer).await.unwrap();
        assert_eq!(verified.token_id, dct.token_id);

        let mut tampered = bearer.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(service.verify_dct(&tampered).await.is_err());
    }

    #[tokio::test]
    async fn revoked_token_fails_verification_immediately() {
        let service = service();
        let request = base_request(PrincipalKind::Agent, vec!["web_search"]);
        let (dct, bearer) = service.mint_dct(request, None).await.unwrap();
        service.revoke_dct(&dct.token_id).await.unwrap();
        let err = service.verify_dct(&bearer).await.unwrap_err();
        assert!(matches!(err, TokenError::Revoked));
    }
}
