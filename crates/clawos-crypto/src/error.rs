use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to serialize value for encryption")]
    Serialize,
    #[error("encryption failed")]
    EncryptFailed,
    #[error("decrypt_failed")]
    DecryptFailed,
    #[error("invalid master key")]
    InvalidMasterKey,
    #[error("invalid_signature")]
    InvalidSignature,
}
