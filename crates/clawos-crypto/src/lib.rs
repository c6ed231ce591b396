//! AES-256-GCM envelope encryption and HMAC-SHA256 bearer-token signing.
//!
//! Grounded on the AES-GCM decrypt-with-derived-key pattern used by the
//! pack's vault client; this crate adds the HMAC signing half the kernel
//! needs for bearer tokens and a constant-time verifier.

mod error;

pub use error::CryptoError;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::{STANDARD as B64_STANDARD, URL_SAFE_NO_PAD as B64_URL};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// 32 raw bytes used as the AES-256-GCM key. Generated once at kernel
/// setup and persisted hex-encoded in kernel state.
#[derive(Clone)]
pub struct MasterKey(pub [u8; 32]);

impl MasterKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        if hex.len() != 64 {
            return Err(CryptoError::InvalidMasterKey);
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).map_err(|_| CryptoError::InvalidMasterKey)?;
            bytes[i] = u8::from_str_radix(s, 16).map_err(|_| CryptoError::InvalidMasterKey)?;
        }
        Ok(Self(bytes))
    }
}

/// Encrypts `value` as canonical JSON under `key`, returning
/// `base64(iv || tag || ct)`.
pub fn encrypt<T: Serialize>(key: &MasterKey, value: &T) -> Result<String, CryptoError> {
    let plaintext = serde_json::to_vec(value).map_err(|_| CryptoError::Serialize)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));

    let mut iv = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let ct_and_tag = cipher
        .encrypt(
            nonce,
            Payload {
                msg: &plaintext,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::EncryptFailed)?;

    // RustCrypto's `encrypt` appends the tag after the ciphertext; the
    // wire layout puts the tag second overall but before the ciphertext.
    let tag_at = ct_and_tag.len() - TAG_LEN;
    let (ciphertext, tag) = ct_and_tag.split_at(tag_at);

    let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(tag);
    out.extend_from_slice(ciphertext);
    Ok(B64_STANDARD.encode(out))
}

/// Inverse of [`encrypt`]. Any authentication failure (including a
/// tampered ciphertext byte) returns [`CryptoError::DecryptFailed`] and
/// never reveals which byte differed.
pub fn decrypt<T: DeserializeOwned>(key: &MasterKey, b64: &str) -> Result<T, CryptoError> {
    let raw = B64_STANDARD
        .decode(b64)
        .map_err(|_| CryptoError::DecryptFailed)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptFailed);
    }
    let (iv, rest) = raw.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let nonce = Nonce::from_slice(iv);

    // RustCrypto expects `ciphertext || tag`; re-assemble from the wire's
    // `tag || ciphertext` order.
    let mut ct_and_tag = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    ct_and_tag.extend_from_slice(ciphertext);
    ct_and_tag.extend_from_slice(tag);

    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &ct_and_tag,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::DecryptFailed)?;

    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::DecryptFailed)
}

/// The signing key used for bearer tokens: the hex SHA-256 hash of the
/// recovery phrase, or `"dev"` if one has not been set.
#[derive(Clone)]
pub struct HmacKey(pub Vec<u8>);

impl HmacKey {
    pub fn from_recovery_hash(recovery_hash_hex: Option<&str>) -> Self {
        Self(
            recovery_hash_hex
                .unwrap_or("dev")
                .as_bytes()
                .to_vec(),
        )
    }

    pub fn dev() -> Self {
        Self(b"dev".to_vec())
    }
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// `base64url(HMAC-SHA256(hmac_key, id))`, unpadded.
pub fn sign(hmac_key: &HmacKey, id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(&hmac_key.0).expect("HMAC accepts any key length");
    mac.update(id.as_bytes());
    B64_URL.encode(mac.finalize().into_bytes())
}

/// Splits `bearer` on its last `.`, constant-time-compares the signature
/// portion against a freshly computed one, and returns the `token_id`
/// prefix on success.
pub fn verify(hmac_key: &HmacKey, bearer: &str) -> Result<String, CryptoError> {
    let (token_id, sig) = bearer
        .rsplit_once('.')
        .ok_or(CryptoError::InvalidSignature)?;

    let expected = sign(hmac_key, token_id);

    let actual_bytes = sig.as_bytes();
    let expected_bytes = expected.as_bytes();

    // Constant-time across a length mismatch too: compare against a
    // same-length buffer so early return never leaks signature length.
    let matches = if actual_bytes.len() == expected_bytes.len() {
        actual_bytes.ct_eq(expected_bytes).into()
    } else {
        false
    };

    if matches {
        Ok(token_id.to_string())
    } else {
        Err(CryptoError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_arbitrary_json() {
        let key = MasterKey::generate();
        let value = json!({"a": 1, "b": ["x", "y"], "c": null});
        let ct = encrypt(&key, &value).unwrap();
        let pt: serde_json::Value = decrypt(&key, &ct).unwrap();
        assert_eq!(pt, value);
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let key = MasterKey::generate();
        let ct = encrypt(&key, &json!({"x": 1})).unwrap();
        let mut raw = B64_STANDARD.decode(&ct).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = B64_STANDARD.encode(raw);
        let result: Result<serde_json::Value, _> = decrypt(&key, &tampered);
        assert!(matches!(result, Err(CryptoError::DecryptFailed)));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let key = HmacKey::dev();
        let sig = sign(&key, "dct_abcdef");
        let bearer = format!("dct_abcdef.{sig}");
        assert_eq!(verify(&key, &bearer).unwrap(), "dct_abcdef");
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let key = HmacKey::dev();
        let sig = sign(&key, "dct_abcdef");
        let mut bytes = sig.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'a' { b'b' } else { b'a' };
        let bad_sig = String::from_utf8(bytes).unwrap();
        let bearer = format!("dct_abcdef.{bad_sig}");
        assert!(verify(&key, &bearer).is_err());
    }

    #[test]
    fn master_key_hex_round_trips() {
        let key = MasterKey::generate();
        let hex = key.to_hex();
        let restored = MasterKey::from_hex(&hex).unwrap();
        assert_eq!(key.0, restored.0);
    }
}
