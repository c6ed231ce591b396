//! Embedded SQLite backend, WAL mode, no external database dependency.
//!
//! Follows the teacher's `maple-storage` Postgres adapter convention of a
//! `data` JSON-text blob column plus a handful of indexed natural-key
//! columns, swapped from JSONB to SQLite `TEXT` (SQLite has no native
//! JSON column type) and from `init_schema`'s raw DDL strings to the same
//! pattern here.

use crate::error::StorageError;
use crate::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clawos_types::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{db_path}"))
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workspaces (id TEXT PRIMARY KEY, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS agents (id TEXT PRIMARY KEY, workspace_id TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS subagents (id TEXT PRIMARY KEY, task_id TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS tasks (id TEXT PRIMARY KEY, workspace_id TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS artifacts (id TEXT PRIMARY KEY, task_id TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS events (id TEXT PRIMARY KEY, task_id TEXT NOT NULL, ts TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS action_requests (id TEXT PRIMARY KEY, workspace_id TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS dcts (id TEXT PRIMARY KEY, expires_at TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS approvals (id TEXT PRIMARY KEY, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS dars (id TEXT PRIMARY KEY, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS cap_tokens (id TEXT PRIMARY KEY, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS risk_policies (action_type TEXT NOT NULL, workspace_id TEXT NOT NULL, data TEXT NOT NULL, PRIMARY KEY (action_type, workspace_id));
            CREATE TABLE IF NOT EXISTS sessions (id TEXT PRIMARY KEY, workspace_id TEXT NOT NULL, channel TEXT NOT NULL, remote_jid TEXT NOT NULL, last_message_at TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS objectives (id TEXT PRIMARY KEY, session_id TEXT NOT NULL, created_at TEXT NOT NULL, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS connections (provider TEXT PRIMARY KEY, data TEXT NOT NULL);
            CREATE TABLE IF NOT EXISTS kernel_state (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl WorkspaceStore for SqliteStore {
    async fn create_workspace(&self, workspace: Workspace) -> StoreResult<Workspace> {
        let data = encode(&workspace)?;
        sqlx::query("INSERT OR REPLACE INTO workspaces (id, data) VALUES (?, ?)")
            .bind(workspace.id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(workspace)
    }

    async fn get_workspace(&self, id: &WorkspaceId) -> StoreResult<Option<Workspace>> {
        let row = sqlx::query("SELECT data FROM workspaces WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn upsert_agent(&self, agent: Agent) -> StoreResult<Agent> {
        let data = encode(&agent)?;
        sqlx::query("INSERT OR REPLACE INTO agents (id, workspace_id, data) VALUES (?, ?, ?)")
            .bind(agent.agent_id.as_str())
            .bind(agent.workspace_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(agent)
    }

    async fn get_agent(&self, id: &AgentId) -> StoreResult<Option<Agent>> {
        let row = sqlx::query("SELECT data FROM agents WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn insert_subagent(&self, subagent: Subagent) -> StoreResult<Subagent> {
        let existing = self.get_subagent(&subagent.subagent_id).await?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists);
        }
        let data = encode(&subagent)?;
        sqlx::query("INSERT INTO subagents (id, task_id, data) VALUES (?, ?, ?)")
            .bind(subagent.subagent_id.as_str())
            .bind(subagent.task_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(subagent)
    }

    async fn get_subagent(&self, id: &SubagentId) -> StoreResult<Option<Subagent>> {
        let row = sqlx::query("SELECT data FROM subagents WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_subagent(&self, subagent: Subagent) -> StoreResult<Subagent> {
        let data = encode(&subagent)?;
        sqlx::query("UPDATE subagents SET data = ? WHERE id = ?")
            .bind(data)
            .bind(subagent.subagent_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(subagent)
    }

    async fn list_subagents_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Subagent>> {
        let rows = sqlx::query("SELECT data FROM subagents WHERE task_id = ?")
            .bind(task_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| decode(r.get::<String, _>("data").as_str()))
            .collect()
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn create_task(&self, task: Task) -> StoreResult<Task> {
        let existing = self.get_task(&task.task_id).await?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists);
        }
        let data = encode(&task)?;
        sqlx::query("INSERT INTO tasks (id, workspace_id, data) VALUES (?, ?, ?)")
            .bind(task.task_id.as_str())
            .bind(task.workspace_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(task)
    }

    async fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        let row = sqlx::query("SELECT data FROM tasks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_task(&self, task: Task) -> StoreResult<Task> {
        let data = encode(&task)?;
        sqlx::query("UPDATE tasks SET data = ? WHERE id = ?")
            .bind(data)
            .bind(task.task_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(task)
    }

    async fn create_artifact(&self, artifact: Artifact) -> StoreResult<Artifact> {
        let data = encode(&artifact)?;
        sqlx::query("INSERT INTO artifacts (id, task_id, data) VALUES (?, ?, ?)")
            .bind(artifact.artifact_id.as_str())
            .bind(artifact.task_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(artifact)
    }

    async fn list_artifacts_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Artifact>> {
        let rows = sqlx::query("SELECT data FROM artifacts WHERE task_id = ?")
            .bind(task_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| decode(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn append_event(&self, event: Event) -> StoreResult<Event> {
        let data = encode(&event)?;
        sqlx::query("INSERT INTO events (id, task_id, ts, data) VALUES (?, ?, ?, ?)")
            .bind(event.event_id.as_str())
            .bind(event.task_id.as_str())
            .bind(event.ts.to_rfc3339())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(event)
    }

    async fn list_events_for_task(&self, task_id: &TaskId) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query("SELECT data FROM events WHERE task_id = ? ORDER BY ts ASC")
            .bind(task_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| decode(r.get::<String, _>("data").as_str()))
            .collect()
    }
}

#[async_trait]
impl ActionRequestStore for SqliteStore {
    async fn create_action_request(&self, request: ActionRequest) -> StoreResult<ActionRequest> {
        let existing = self.get_action_request(&request.request_id).await?;
        if existing.is_some() {
            return Err(StorageError::AlreadyExists);
        }
        let data = encode(&request)?;
        sqlx::query("INSERT INTO action_requests (id, workspace_id, data) VALUES (?, ?, ?)")
            .bind(request.request_id.as_str())
            .bind(request.workspace_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(request)
    }

    async fn get_action_request(
        &self,
        id: &ActionRequestId,
    ) -> StoreResult<Option<ActionRequest>> {
        let row = sqlx::query("SELECT data FROM action_requests WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_action_request(&self, request: ActionRequest) -> StoreResult<ActionRequest> {
        let data = encode(&request)?;
        sqlx::query("UPDATE action_requests SET data = ? WHERE id = ?")
            .bind(data)
            .bind(request.request_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(request)
    }
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn insert_dct(&self, dct: Dct) -> StoreResult<Dct> {
        let data = encode(&dct)?;
        sqlx::query("INSERT INTO dcts (id, expires_at, data) VALUES (?, ?, ?)")
            .bind(dct.token_id.as_str())
            .bind(dct.expires_at.to_rfc3339())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(dct)
    }

    async fn get_dct(&self, id: &TokenId) -> StoreResult<Option<Dct>> {
        let row = sqlx::query("SELECT data FROM dcts WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_dct(&self, dct: Dct) -> StoreResult<Dct> {
        let data = encode(&dct)?;
        sqlx::query("UPDATE dcts SET data = ?, expires_at = ? WHERE id = ?")
            .bind(data)
            .bind(dct.expires_at.to_rfc3339())
            .bind(dct.token_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(dct)
    }

    async fn delete_expired_dcts(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM dcts WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ApprovalStore for SqliteStore {
    async fn create_approval(&self, approval: Approval) -> StoreResult<Approval> {
        let data = encode(&approval)?;
        sqlx::query("INSERT INTO approvals (id, data) VALUES (?, ?)")
            .bind(approval.approval_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(approval)
    }

    async fn get_approval(&self, id: &ApprovalId) -> StoreResult<Option<Approval>> {
        let row = sqlx::query("SELECT data FROM approvals WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_approval(&self, approval: Approval) -> StoreResult<Approval> {
        let data = encode(&approval)?;
        sqlx::query("UPDATE approvals SET data = ? WHERE id = ?")
            .bind(data)
            .bind(approval.approval_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(approval)
    }

    async fn create_dar(&self, dar: DctApprovalRequest) -> StoreResult<DctApprovalRequest> {
        let data = encode(&dar)?;
        sqlx::query("INSERT INTO dars (id, data) VALUES (?, ?)")
            .bind(dar.dar_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(dar)
    }

    async fn get_dar(&self, id: &DarId) -> StoreResult<Option<DctApprovalRequest>> {
        let row = sqlx::query("SELECT data FROM dars WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_dar(&self, dar: DctApprovalRequest) -> StoreResult<DctApprovalRequest> {
        let data = encode(&dar)?;
        sqlx::query("UPDATE dars SET data = ? WHERE id = ?")
            .bind(data)
            .bind(dar.dar_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(dar)
    }

    async fn create_cap_token(&self, token: CapToken) -> StoreResult<CapToken> {
        let data = encode(&token)?;
        sqlx::query("INSERT INTO cap_tokens (id, data) VALUES (?, ?)")
            .bind(token.token_id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    async fn get_cap_token(&self, id: &TokenId) -> StoreResult<Option<CapToken>> {
        let row = sqlx::query("SELECT data FROM cap_tokens WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }
}

#[async_trait]
impl PolicyStore for SqliteStore {
    async fn upsert_risk_policy(&self, policy: RiskPolicy) -> StoreResult<RiskPolicy> {
        let data = encode(&policy)?;
        sqlx::query(
            "INSERT OR REPLACE INTO risk_policies (action_type, workspace_id, data) VALUES (?, ?, ?)",
        )
        .bind(&policy.action_type)
        .bind(policy.workspace_id.as_str())
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(policy)
    }

    async fn get_risk_policy(
        &self,
        action_type: &str,
        workspace_id: &str,
    ) -> StoreResult<Option<RiskPolicy>> {
        let row = sqlx::query(
            "SELECT data FROM risk_policies WHERE action_type = ? AND workspace_id = ?",
        )
        .bind(action_type)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn list_risk_policies(&self) -> StoreResult<Vec<RiskPolicy>> {
        let rows = sqlx::query("SELECT data FROM risk_policies")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| decode(r.get::<String, _>("data").as_str()))
            .collect()
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        let data = encode(&session)?;
        sqlx::query(
            "INSERT INTO sessions (id, workspace_id, channel, remote_jid, last_message_at, data) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session.session_id.as_str())
        .bind(session.workspace_id.as_str())
        .bind(&session.channel)
        .bind(&session.remote_jid)
        .bind(session.last_message_at.to_rfc3339())
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let row = sqlx::query("SELECT data FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn find_latest_session(
        &self,
        workspace_id: &WorkspaceId,
        channel: &str,
        remote_jid: &str,
    ) -> StoreResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT data FROM sessions WHERE workspace_id = ? AND channel = ? AND remote_jid = ? ORDER BY last_message_at DESC LIMIT 1",
        )
        .bind(workspace_id.as_str())
        .bind(channel)
        .bind(remote_jid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_session(&self, session: Session) -> StoreResult<Session> {
        let data = encode(&session)?;
        sqlx::query("UPDATE sessions SET data = ?, last_message_at = ? WHERE id = ?")
            .bind(data)
            .bind(session.last_message_at.to_rfc3339())
            .bind(session.session_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(session)
    }

    async fn create_objective(
        &self,
        objective: CognitiveObjective,
    ) -> StoreResult<CognitiveObjective> {
        let data = encode(&objective)?;
        sqlx::query("INSERT INTO objectives (id, session_id, created_at, data) VALUES (?, ?, ?, ?)")
            .bind(objective.objective_id.as_str())
            .bind(objective.session_id.as_str())
            .bind(objective.created_at.to_rfc3339())
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(objective)
    }

    async fn get_objective(&self, id: &ObjectiveId) -> StoreResult<Option<CognitiveObjective>> {
        let row = sqlx::query("SELECT data FROM objectives WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn find_latest_objective_for_session(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<CognitiveObjective>> {
        let row = sqlx::query(
            "SELECT data FROM objectives WHERE session_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn update_objective(
        &self,
        objective: CognitiveObjective,
    ) -> StoreResult<CognitiveObjective> {
        let data = encode(&objective)?;
        sqlx::query("UPDATE objectives SET data = ? WHERE id = ?")
            .bind(data)
            .bind(objective.objective_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(objective)
    }
}

#[async_trait]
impl ConnectionStore for SqliteStore {
    async fn upsert_connection(&self, connection: Connection) -> StoreResult<Connection> {
        let data = encode(&connection)?;
        sqlx::query("INSERT OR REPLACE INTO connections (provider, data) VALUES (?, ?)")
            .bind(&connection.provider)
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(connection)
    }

    async fn get_connection(&self, provider: &str) -> StoreResult<Option<Connection>> {
        let row = sqlx::query("SELECT data FROM connections WHERE provider = ?")
            .bind(provider)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn list_connections(&self) -> StoreResult<Vec<Connection>> {
        let rows = sqlx::query("SELECT data FROM connections")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| decode(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn delete_connection(&self, provider: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM connections WHERE provider = ?")
            .bind(provider)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KernelStateStore for SqliteStore {
    async fn get_state(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kernel_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set_state(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query("INSERT OR REPLACE INTO kernel_state (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
