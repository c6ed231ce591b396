use serde::{Deserialize, Serialize};

/// Kernel-state key under which the AES master key is persisted, hex
/// encoded, once generated.
pub const MASTER_KEY_STATE_KEY: &str = "connections_key";

/// Kernel-state key under which the recovery-phrase hash is persisted.
pub const RECOVERY_HASH_STATE_KEY: &str = "recovery_hash";

/// A single `{ key, value }` row in the kernel state table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelStateRow {
    pub key: String,
    pub value: String,
}
