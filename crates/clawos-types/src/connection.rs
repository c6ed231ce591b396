use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Untested,
    Ok,
    Error,
}

/// Encrypted credential store entry. `encrypted_secret` layout is
/// `iv(12) || tag(16) || ct`, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub provider: String,
    pub encrypted_secret: String,
    pub status: ConnectionStatus,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}
