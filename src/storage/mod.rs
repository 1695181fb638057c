//! Storage backends and the typed store facade.
//!
//! `StorageBackend` is the seam the host platform plugs into;
//! `MemoryStore` and `FileStore` are the two bundled implementations
//! (ephemeral and durable respectively).  `SecureStore` sits on top and
//! knows the two records the vault persists: the encrypted vault blob
//! and the master-password verification record.

pub mod backend;
pub mod file;
pub mod memory;

use std::sync::Arc;

use crate::errors::{CredVaultError, Result};
use crate::vault::record::{EncryptedVaultRecord, VerifyRecord};

pub use backend::StorageBackend;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Key the encrypted vault blob is stored under.
const VAULT_RECORD_KEY: &str = "vault.record";

/// Key the master-password verification record is stored under.
const VERIFY_RECORD_KEY: &str = "master.verify";

/// Typed facade over the durable storage backend.
///
/// There is at most one vault record and one verify record; every write
/// fully replaces the previous value, so the durable state is always a
/// complete snapshot.
pub struct SecureStore {
    backend: Arc<dyn StorageBackend>,
}

impl SecureStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Load the encrypted vault record, if one exists.
    pub async fn load_record(&self) -> Result<Option<EncryptedVaultRecord>> {
        let Some(bytes) = self.backend.get(VAULT_RECORD_KEY).await? else {
            return Ok(None);
        };

        let record = serde_json::from_slice(&bytes)
            .map_err(|e| CredVaultError::Storage(format!("corrupt vault record: {e}")))?;

        Ok(Some(record))
    }

    /// Persist the encrypted vault record, replacing any previous one.
    pub async fn save_record(&self, record: &EncryptedVaultRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| CredVaultError::Serialization(format!("vault record: {e}")))?;

        self.backend.set(VAULT_RECORD_KEY, &bytes).await
    }

    /// Load the master-password verification record, if one exists.
    pub async fn load_verify(&self) -> Result<Option<VerifyRecord>> {
        let Some(bytes) = self.backend.get(VERIFY_RECORD_KEY).await? else {
            return Ok(None);
        };

        let record = serde_json::from_slice(&bytes)
            .map_err(|e| CredVaultError::Storage(format!("corrupt verify record: {e}")))?;

        Ok(Some(record))
    }

    /// Persist the master-password verification record.
    pub async fn save_verify(&self, record: &VerifyRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| CredVaultError::Serialization(format!("verify record: {e}")))?;

        self.backend.set(VERIFY_RECORD_KEY, &bytes).await
    }
}
