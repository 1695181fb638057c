//! Session persistence.
//!
//! The master key is never written to durable storage, but the host's
//! background process can be torn down and restarted at any time.  A
//! `Session` bridges that gap: it lives in the host's *ephemeral*
//! storage area, which survives process restarts but is wiped when the
//! whole application closes.  That boundary is deliberate: staying
//! unlocked across a worker restart is convenience, staying unlocked
//! across an application relaunch would defeat locking entirely.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{CredVaultError, Result};
use crate::storage::StorageBackend;
use crate::vault::record::{base64_decode, base64_encode};

/// Key the session is stored under in the ephemeral area.
const SESSION_KEY: &str = "credvault.session";

/// Everything needed to resume an unlocked vault without a password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The raw vault key.  Ephemeral storage only, never durable.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub key: Vec<u8>,

    /// The vault salt at unlock time.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// The IV of the record as last persisted.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    /// When the vault was unlocked.
    pub unlocked_at: DateTime<Utc>,

    /// When this session was written (stamped by `save_session`).
    pub saved_at: DateTime<Utc>,
}

/// Stores and retrieves the single session record with an expiry policy.
pub struct SessionManager {
    backend: Arc<dyn StorageBackend>,
    max_age: Duration,
}

impl SessionManager {
    /// `max_age_minutes` bounds how old a session may be before
    /// `get_session` treats it as absent.
    pub fn new(backend: Arc<dyn StorageBackend>, max_age_minutes: i64) -> Self {
        Self {
            backend,
            max_age: Duration::minutes(max_age_minutes),
        }
    }

    /// Write the session, overwriting any prior one.
    pub async fn save_session(&self, mut session: Session) -> Result<()> {
        session.saved_at = Utc::now();

        let bytes = serde_json::to_vec(&session)
            .map_err(|e| CredVaultError::Serialization(format!("session: {e}")))?;

        self.backend.set(SESSION_KEY, &bytes).await?;
        debug!("session saved");
        Ok(())
    }

    /// Read the session, if one exists and is not stale.
    ///
    /// Corrupt or expired entries are discarded and reported as absent,
    /// so a failed restore degrades to a normal locked start.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        let Some(bytes) = self.backend.get(SESSION_KEY).await? else {
            return Ok(None);
        };

        let session: Session = match serde_json::from_slice(&bytes) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "discarding corrupt session");
                self.backend.remove(SESSION_KEY).await?;
                return Ok(None);
            }
        };

        if Utc::now() - session.saved_at > self.max_age {
            debug!("discarding stale session");
            self.backend.remove(SESSION_KEY).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Remove any stored session.
    pub async fn clear_session(&self) -> Result<()> {
        self.backend.remove(SESSION_KEY).await?;
        debug!("session cleared");
        Ok(())
    }

    /// Whether a live (non-stale) session exists.
    pub async fn has_session(&self) -> Result<bool> {
        Ok(self.get_session().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn session() -> Session {
        Session {
            key: vec![0xAA; 32],
            salt: vec![0xBB; 32],
            iv: vec![0xCC; 12],
            unlocked_at: Utc::now(),
            saved_at: Utc::now(),
        }
    }

    fn manager(max_age_minutes: i64) -> SessionManager {
        SessionManager::new(Arc::new(MemoryStore::new()), max_age_minutes)
    }

    #[tokio::test]
    async fn save_get_clear_roundtrip() {
        let sessions = manager(480);
        assert!(!sessions.has_session().await.unwrap());

        sessions.save_session(session()).await.unwrap();
        let loaded = sessions.get_session().await.unwrap().unwrap();
        assert_eq!(loaded.key, vec![0xAA; 32]);

        sessions.clear_session().await.unwrap();
        assert!(!sessions.has_session().await.unwrap());
    }

    #[tokio::test]
    async fn save_overwrites_prior_session() {
        let sessions = manager(480);
        sessions.save_session(session()).await.unwrap();

        let mut second = session();
        second.key = vec![0x11; 32];
        sessions.save_session(second).await.unwrap();

        let loaded = sessions.get_session().await.unwrap().unwrap();
        assert_eq!(loaded.key, vec![0x11; 32]);
    }

    #[tokio::test]
    async fn stale_session_reads_as_absent() {
        // Zero max age: anything saved is immediately stale.
        let sessions = manager(0);
        sessions.save_session(session()).await.unwrap();

        // saved_at is stamped at save time, so even a fresh write has
        // age > 0 by the time we read it back.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(sessions.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_session_reads_as_absent() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("credvault.session", b"garbage").await.unwrap();

        let sessions = SessionManager::new(backend.clone(), 480);
        assert!(sessions.get_session().await.unwrap().is_none());

        // And the corrupt entry is gone.
        assert!(backend.get("credvault.session").await.unwrap().is_none());
    }
}
