//! Key-value storage seam.
//!
//! The host platform provides the actual storage (a browser extension
//! would hand us its local and session storage areas).  The core only
//! needs `get`/`set`/`remove` with read-your-writes consistency, so
//! that is all the trait asks for.

use async_trait::async_trait;

use crate::errors::{CredVaultError, Result};

/// Adapter for a key-value storage area.
///
/// Implementations must guarantee that a `set` is atomic: a reader
/// either sees the previous value or the new one, never a torn write.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove the value stored under `key` (no-op if absent).
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Validate that a storage key is safe to use as a file name.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty and at most 256 characters.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CredVaultError::Storage("storage key cannot be empty".into()));
    }
    if key.len() > 256 {
        return Err(CredVaultError::Storage(
            "storage key cannot exceed 256 characters".into(),
        ));
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(CredVaultError::Storage(format!(
            "storage key '{key}' contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_keys() {
        assert!(validate_key("vault.record").is_ok());
        assert!(validate_key("master-verify_v1").is_ok());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("with space").is_err());
        assert!(validate_key(&"x".repeat(300)).is_err());
    }
}
