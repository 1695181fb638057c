//! Durable record shapes.
//!
//! `EncryptedVaultRecord` is the only form the credential list ever
//! takes on disk: an AEAD blob plus the IV it was sealed under and the
//! salt the key derives from.  `VerifyRecord` is the independent
//! master-password check (its salt is unrelated to the vault salt).
//!
//! Byte fields serialize as base64 strings in JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current record format version.
pub const VAULT_FORMAT_VERSION: u32 = 1;

/// The encrypted vault blob as persisted to durable storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedVaultRecord {
    /// AES-256-GCM ciphertext of the serialized `VaultData`.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// The IV this ciphertext was sealed under.  Regenerated on every
    /// save; never reused with the same key.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    /// The salt the vault key derives from.  Fixed for the lifetime of
    /// a master password; only a password change regenerates it.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// Record format version.
    #[serde(default = "default_version")]
    pub version: u32,

    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    VAULT_FORMAT_VERSION
}

/// Independent master-password verification hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRecord {
    /// Base64 Argon2id digest of the master password.
    pub hash: String,

    /// The salt for the digest, independent of the vault salt.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_bytes_as_base64() {
        let record = EncryptedVaultRecord {
            ciphertext: vec![0xDE, 0xAD],
            iv: vec![0; 12],
            salt: vec![1; 32],
            version: VAULT_FORMAT_VERSION,
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ciphertext"], "3q0=");
        assert!(json["iv"].is_string());
        assert!(json["salt"].is_string());
    }

    #[test]
    fn missing_version_defaults_to_current() {
        let json = r#"{
            "ciphertext": "3q0=",
            "iv": "AAAAAAAAAAAAAAAA",
            "salt": "AQEB",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;

        let record: EncryptedVaultRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.version, VAULT_FORMAT_VERSION);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let json = r#"{
            "ciphertext": "!!!",
            "iv": "AAAAAAAAAAAAAAAA",
            "salt": "AQEB",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;

        let result: std::result::Result<EncryptedVaultRecord, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
