//! Durable state for the ClawOS kernel: a `ClawStore` trait object with an
//! in-memory backend for tests and a WAL-mode SQLite backend for the
//! running kernel — no external database dependency, per the persisted
//! state requirement.

mod error;
mod memory;
mod sqlite;
mod traits;

pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clawos_types::*;

    #[tokio::test]
    async fn workspace_round_trips_through_memory_store() {
        let store = InMemoryStore::new();
        let ws = Workspace {
            id: WorkspaceId::new(),
            workspace_type: "default".into(),
            created_at: Utc::now(),
        };
        store.create_workspace(ws.clone()).await.unwrap();
        let fetched = store.get_workspace(&ws.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, ws.id);
    }

    #[tokio::test]
    async fn duplicate_subagent_insert_is_rejected() {
        let store = InMemoryStore::new();
        let subagent = Subagent {
            subagent_id: SubagentId::new(),
            parent_agent_id: AgentId::from("orchestrator"),
            workspace_id: WorkspaceId::new(),
            task_id: TaskId::new(),
            step_id: None,
            worker_type: "web_researcher".into(),
            status: SubagentStatus::Created,
            created_at: Utc::now(),
            finished_at: None,
        };
        store.insert_subagent(subagent.clone()).await.unwrap();
        let err = store.insert_subagent(subagent).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists));
    }

    #[tokio::test]
    async fn delete_expired_dcts_removes_only_expired_rows() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let fresh = sample_dct(now + chrono::Duration::seconds(600));
        let stale = sample_dct(now - chrono::Duration::seconds(1));
        store.insert_dct(fresh.clone()).await.unwrap();
        store.insert_dct(stale.clone()).await.unwrap();

        let removed = store.delete_expired_dcts(now).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_dct(&fresh.token_id).await.unwrap().is_some());
        assert!(store.get_dct(&stale.token_id).await.unwrap().is_none());
    }

    fn sample_dct(expires_at: chrono::DateTime<Utc>) -> Dct {
        Dct {
            token_id: TokenId::generate("dct_"),
            workspace_id: WorkspaceId::new(),
            issued_to_kind: PrincipalKind::Agent,
            issued_to_id: "orchestrator".into(),
            parent_agent_id: None,
            task_id: None,
            scope: ScopeSpec::new(vec!["web_search".into()]),
            ttl_seconds: 600,
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        }
    }
}
