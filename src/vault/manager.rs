//! Vault lifecycle: the Locked/Unlocked state machine.
//!
//! `VaultManager` is the only owner of key material and decrypted
//! credentials.  Every operation, persist step included, runs under a
//! single async mutex, so two in-flight messages can never interleave a
//! read-modify-write of the credential list.  A `lock()` issued while
//! another operation is in progress queues behind it; when the auto-lock
//! timer races an unlock, the lock wins by running after it.
//!
//! Every mutation re-encrypts the whole vault under a fresh IV and
//! atomically replaces the durable record.  A crash between the
//! in-memory mutation and the persist loses that mutation but can never
//! corrupt the record.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::autolock::AutoLockScheduler;
use crate::config::Settings;
use crate::crypto::kdf::KEY_LEN;
use crate::crypto::{
    decrypt_data, derive_master_key_with_params, encrypt_data, generate_salt,
    hash_master_password, verify_master_password, MasterKey,
};
use crate::errors::{CredVaultError, Result};
use crate::remote::RemoteVerifier;
use crate::session::{Session, SessionManager};
use crate::storage::SecureStore;

use super::credential::{Credential, CredentialChanges, CredentialDraft, VaultData};
use super::record::{EncryptedVaultRecord, VerifyRecord, VAULT_FORMAT_VERSION};

/// Key material and plaintext credentials while unlocked.
struct UnlockedVault {
    key: MasterKey,
    salt: Vec<u8>,
    /// IV of the most recently persisted record, carried into the session.
    last_iv: Vec<u8>,
    data: VaultData,
}

enum VaultState {
    Locked,
    Unlocked(UnlockedVault),
}

impl VaultState {
    fn is_unlocked(&self) -> bool {
        matches!(self, VaultState::Unlocked(_))
    }

    fn unlocked(&self) -> Result<&UnlockedVault> {
        match self {
            VaultState::Unlocked(vault) => Ok(vault),
            VaultState::Locked => Err(CredVaultError::VaultLocked),
        }
    }

    fn unlocked_mut(&mut self) -> Result<&mut UnlockedVault> {
        match self {
            VaultState::Unlocked(vault) => Ok(vault),
            VaultState::Locked => Err(CredVaultError::VaultLocked),
        }
    }
}

/// The vault state machine.  Construct with [`VaultManager::new`]; the
/// returned `Arc` is the only handle, other execution contexts reach it
/// through the message router, never by reference.
pub struct VaultManager {
    weak_self: Weak<VaultManager>,
    store: SecureStore,
    sessions: SessionManager,
    remote: Option<Arc<dyn RemoteVerifier>>,
    settings: Settings,
    autolock: AutoLockScheduler,
    /// Serializes every vault operation, persist step included.
    state: Mutex<VaultState>,
}

impl VaultManager {
    pub fn new(store: SecureStore, sessions: SessionManager, settings: Settings) -> Arc<Self> {
        Self::with_remote(store, sessions, settings, None)
    }

    /// Construct with an optional remote verification service.
    pub fn with_remote(
        store: SecureStore,
        sessions: SessionManager,
        settings: Settings,
        remote: Option<Arc<dyn RemoteVerifier>>,
    ) -> Arc<Self> {
        // new_cyclic gives the auto-lock callback a Weak handle back to
        // the manager without keeping it alive from inside a timer.
        Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            store,
            sessions,
            remote,
            settings,
            autolock: AutoLockScheduler::new(),
            state: Mutex::new(VaultState::Locked),
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// First-run master password setup.
    ///
    /// Stores the independent verification hash, registers it remotely
    /// when a remote is configured (unreachable degrades to offline),
    /// creates an empty encrypted vault under a fresh salt, and leaves
    /// the vault unlocked.
    pub async fn initialize(&self, master_password: &str) -> Result<()> {
        if master_password.len() < 8 {
            return Err(CredVaultError::Validation(
                "master password must be at least 8 characters".into(),
            ));
        }

        let mut state = self.state.lock().await;

        if self.store.load_record().await?.is_some() || self.store.load_verify().await?.is_some() {
            return Err(CredVaultError::AlreadyInitialized);
        }

        // Verification hash under its own salt, unrelated to the vault salt.
        let verify_salt = generate_salt().to_vec();
        let hash = self.hash_blocking(master_password, &verify_salt).await?;

        // Best-effort remote registration.
        if let Some(remote) = &self.remote {
            match remote.update_master_password(&hash).await {
                Ok(()) => debug!("master password hash registered remotely"),
                Err(error) => warn!(%error, "remote unreachable, continuing in offline mode"),
            }
        }

        self.store
            .save_verify(&VerifyRecord {
                hash,
                salt: verify_salt,
            })
            .await?;

        let vault_salt = generate_salt().to_vec();
        let mut key_bytes = self.derive_blocking(master_password, &vault_salt).await?;
        let key = MasterKey::new(key_bytes);
        key_bytes.zeroize();

        let data = VaultData::empty();
        let iv = self.encrypt_and_store(&key, &vault_salt, &data).await?;

        let vault = UnlockedVault {
            key,
            salt: vault_salt,
            last_iv: iv,
            data,
        };
        self.save_session_for(&vault).await?;
        *state = VaultState::Unlocked(vault);

        drop(state);
        self.arm_auto_lock().await;
        info!("master password configured, vault initialized");
        Ok(())
    }

    /// Unlock the vault with the master password.
    ///
    /// First run (no stored record) creates an empty vault under a
    /// fresh salt.  On an existing vault a failed auth-tag check leaves
    /// the vault locked, returns `InvalidCredentials`, and never
    /// touches the durable record.
    pub async fn unlock(&self, master_password: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.is_unlocked() {
            debug!("unlock requested but vault is already unlocked");
            drop(state);
            self.arm_auto_lock().await;
            return Ok(());
        }

        match self.store.load_record().await? {
            // First run: nothing stored yet.
            None => {
                let salt = generate_salt().to_vec();
                let mut key_bytes = self.derive_blocking(master_password, &salt).await?;
                let key = MasterKey::new(key_bytes);
                key_bytes.zeroize();

                let data = VaultData::empty();
                let iv = self.encrypt_and_store(&key, &salt, &data).await?;

                let vault = UnlockedVault {
                    key,
                    salt,
                    last_iv: iv,
                    data,
                };
                self.save_session_for(&vault).await?;
                *state = VaultState::Unlocked(vault);
                info!("vault created and unlocked");
            }
            Some(record) => {
                // Pre-check against the independent verification hash
                // when one exists.  Full decryption below still has the
                // final say.
                if let Some(verify) = self.store.load_verify().await? {
                    if !self.verify_blocking(master_password, &verify).await? {
                        debug!("verification hash rejected password");
                        return Err(CredVaultError::InvalidCredentials);
                    }
                }

                let mut key_bytes = self.derive_blocking(master_password, &record.salt).await?;
                let key = MasterKey::new(key_bytes);
                key_bytes.zeroize();

                // The auth tag is the wrong-password signal.
                let mut plaintext =
                    decrypt_data(key.as_bytes(), &record.ciphertext, &record.iv)
                        .map_err(|_| CredVaultError::InvalidCredentials)?;

                let parsed: std::result::Result<VaultData, _> =
                    serde_json::from_slice(&plaintext);
                plaintext.zeroize();
                let data = parsed.map_err(|e| {
                    CredVaultError::Serialization(format!("vault payload: {e}"))
                })?;

                let vault = UnlockedVault {
                    key,
                    salt: record.salt.clone(),
                    last_iv: record.iv.clone(),
                    data,
                };
                self.save_session_for(&vault).await?;
                let count = vault.data.passwords.len();
                *state = VaultState::Unlocked(vault);
                info!(credentials = count, "vault unlocked");
            }
        }

        drop(state);
        self.arm_auto_lock().await;
        Ok(())
    }

    /// Lock the vault.  Idempotent.
    ///
    /// Dropping the unlocked state zeroizes the key; the plaintext
    /// credential list is discarded with it.  Clears the session and
    /// cancels the auto-lock timer.
    pub async fn lock(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            *state = VaultState::Locked;
        }
        self.autolock.cancel().await;
        self.sessions.clear_session().await?;
        info!("vault locked");
        Ok(())
    }

    /// Resume an unlocked vault from a live session, without a password.
    ///
    /// Used to survive background-process restarts only.  Returns
    /// `Ok(false)` and stays locked when no usable session exists; a
    /// session that no longer decrypts the current record is discarded.
    pub async fn restore_from_session(&self) -> Result<bool> {
        let mut state = self.state.lock().await;

        if state.is_unlocked() {
            return Ok(true);
        }

        let Some(session) = self.sessions.get_session().await? else {
            debug!("no session to restore");
            return Ok(false);
        };

        let Some(record) = self.store.load_record().await? else {
            warn!("session exists but the vault record is gone, discarding session");
            self.sessions.clear_session().await?;
            return Ok(false);
        };

        let Ok(key_bytes) = <[u8; KEY_LEN]>::try_from(session.key.as_slice()) else {
            warn!("session key has the wrong length, discarding session");
            self.sessions.clear_session().await?;
            return Ok(false);
        };
        let key = MasterKey::new(key_bytes);

        let mut plaintext = match decrypt_data(key.as_bytes(), &record.ciphertext, &record.iv) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                warn!("session key no longer decrypts the vault, discarding session");
                self.sessions.clear_session().await?;
                return Ok(false);
            }
        };

        let parsed: std::result::Result<VaultData, _> = serde_json::from_slice(&plaintext);
        plaintext.zeroize();
        let Ok(data) = parsed else {
            warn!("restored vault payload failed to parse, discarding session");
            self.sessions.clear_session().await?;
            return Ok(false);
        };

        *state = VaultState::Unlocked(UnlockedVault {
            key,
            salt: record.salt.clone(),
            last_iv: record.iv.clone(),
            data,
        });

        drop(state);
        self.arm_auto_lock().await;
        info!("vault session restored");
        Ok(true)
    }

    /// Whether the vault is currently locked.
    pub async fn is_locked(&self) -> bool {
        !self.state.lock().await.is_unlocked()
    }

    /// Whether a master password has ever been configured.
    pub async fn has_master_password(&self) -> Result<bool> {
        Ok(self.store.load_verify().await?.is_some()
            || self.store.load_record().await?.is_some())
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    /// Add a credential.  Requires an unlocked vault; `domain` and
    /// `password` are mandatory.
    pub async fn add_password(&self, draft: CredentialDraft) -> Result<Credential> {
        if draft.domain.trim().is_empty() {
            return Err(CredVaultError::Validation("domain is required".into()));
        }
        if draft.password.is_empty() {
            return Err(CredVaultError::Validation("password is required".into()));
        }

        let mut state = self.state.lock().await;
        let vault = state.unlocked_mut()?;

        let credential = Credential::from_draft(draft);
        vault.data.passwords.push(credential.clone());
        self.persist(vault).await?;

        debug!(id = %credential.id, "credential added");
        Ok(credential)
    }

    /// Merge changes into the credential with the given id.
    ///
    /// A missing id is an error, not a silent no-op.
    pub async fn update_password(
        &self,
        id: Uuid,
        changes: CredentialChanges,
    ) -> Result<Credential> {
        let mut state = self.state.lock().await;
        let vault = state.unlocked_mut()?;

        let Some(credential) = vault.data.passwords.iter_mut().find(|c| c.id == id) else {
            return Err(CredVaultError::CredentialNotFound(id));
        };
        credential.apply(changes);
        let updated = credential.clone();

        self.persist(vault).await?;
        debug!(id = %id, "credential updated");
        Ok(updated)
    }

    /// Remove the credential with the given id.
    pub async fn delete_password(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let vault = state.unlocked_mut()?;

        let before = vault.data.passwords.len();
        vault.data.passwords.retain(|c| c.id != id);
        if vault.data.passwords.len() == before {
            return Err(CredVaultError::CredentialNotFound(id));
        }

        self.persist(vault).await?;
        debug!(id = %id, "credential deleted");
        Ok(())
    }

    /// Case-insensitive substring search over name, domain and
    /// username.  An empty query returns everything.
    pub async fn search_passwords(&self, query: &str) -> Result<Vec<Credential>> {
        let state = self.state.lock().await;
        let vault = state.unlocked()?;

        if query.is_empty() {
            return Ok(vault.data.passwords.clone());
        }

        Ok(vault
            .data
            .passwords
            .iter()
            .filter(|c| c.matches(query))
            .cloned()
            .collect())
    }

    /// Credentials whose domain contains `domain` (case-insensitive).
    pub async fn passwords_for_domain(&self, domain: &str) -> Result<Vec<Credential>> {
        let state = self.state.lock().await;
        let vault = state.unlocked()?;

        let needle = domain.to_lowercase();
        Ok(vault
            .data
            .passwords
            .iter()
            .filter(|c| c.domain.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------
    // Master password operations
    // ------------------------------------------------------------------

    /// Re-key the vault under a new master password.
    ///
    /// Both the vault salt and the verification salt are regenerated;
    /// this is the only operation that replaces the vault salt.
    pub async fn change_master_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.len() < 8 {
            return Err(CredVaultError::Validation(
                "master password must be at least 8 characters".into(),
            ));
        }

        let mut state = self.state.lock().await;
        let vault = state.unlocked_mut()?;

        // Prove the current password by re-deriving against the live salt.
        let mut derived = self.derive_blocking(current_password, &vault.salt).await?;
        let matches = bool::from(derived.ct_eq(vault.key.as_bytes()));
        derived.zeroize();
        if !matches {
            return Err(CredVaultError::InvalidCredentials);
        }

        let new_salt = generate_salt().to_vec();
        let mut new_key_bytes = self.derive_blocking(new_password, &new_salt).await?;
        let new_key = MasterKey::new(new_key_bytes);
        new_key_bytes.zeroize();

        let verify_salt = generate_salt().to_vec();
        let hash = self.hash_blocking(new_password, &verify_salt).await?;

        if let Some(remote) = &self.remote {
            if let Err(error) = remote.update_master_password(&hash).await {
                warn!(%error, "remote unreachable, master password changed locally only");
            }
        }

        let iv = self.encrypt_and_store(&new_key, &new_salt, &vault.data).await?;
        self.store
            .save_verify(&VerifyRecord {
                hash,
                salt: verify_salt,
            })
            .await?;

        vault.key = new_key;
        vault.salt = new_salt;
        vault.last_iv = iv;
        self.save_session_for(vault).await?;

        info!("master password changed");
        Ok(())
    }

    /// Hash a password under a fresh salt, for callers that need the
    /// verification artifact (returns hash and salt).
    pub async fn hash_password(&self, password: &str) -> Result<(String, Vec<u8>)> {
        let salt = generate_salt().to_vec();
        let hash = self.hash_blocking(password, &salt).await?;
        Ok((hash, salt))
    }

    /// Check a password against the stored verification record.
    pub async fn verify_password(&self, password: &str) -> Result<bool> {
        let Some(record) = self.store.load_verify().await? else {
            return Err(CredVaultError::Validation(
                "no master password configured".into(),
            ));
        };
        self.verify_blocking(password, &record).await
    }

    /// Check the remote for a server-side master password record.
    ///
    /// Errors mean the remote is unreachable or not configured; callers
    /// treat that as a degraded (offline) state, never as fatal.
    pub async fn sync_with_remote(&self) -> Result<bool> {
        let Some(remote) = &self.remote else {
            return Err(CredVaultError::RemoteUnavailable(
                "no remote verification service configured".into(),
            ));
        };
        let exists = remote.master_password_exists().await?;
        debug!(exists, "remote master password record checked");
        Ok(exists)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Re-encrypt the whole vault under a fresh IV and replace the
    /// durable record.
    async fn persist(&self, vault: &mut UnlockedVault) -> Result<()> {
        vault.data.updated_at = Utc::now();
        let iv = self
            .encrypt_and_store(&vault.key, &vault.salt, &vault.data)
            .await?;
        vault.last_iv = iv;
        Ok(())
    }

    /// Serialize, encrypt and store `data`; returns the IV used.
    async fn encrypt_and_store(
        &self,
        key: &MasterKey,
        salt: &[u8],
        data: &VaultData,
    ) -> Result<Vec<u8>> {
        let mut plaintext = serde_json::to_vec(data)
            .map_err(|e| CredVaultError::Serialization(format!("vault payload: {e}")))?;

        let payload = encrypt_data(key.as_bytes(), &plaintext);
        plaintext.zeroize();
        let payload = payload?;

        let record = EncryptedVaultRecord {
            ciphertext: payload.ciphertext,
            iv: payload.iv.to_vec(),
            salt: salt.to_vec(),
            version: VAULT_FORMAT_VERSION,
            updated_at: Utc::now(),
        };
        self.store.save_record(&record).await?;

        Ok(payload.iv.to_vec())
    }

    async fn save_session_for(&self, vault: &UnlockedVault) -> Result<()> {
        let now = Utc::now();
        self.sessions
            .save_session(Session {
                key: vault.key.as_bytes().to_vec(),
                salt: vault.salt.clone(),
                iv: vault.last_iv.clone(),
                unlocked_at: now,
                saved_at: now,
            })
            .await
    }

    /// Arm (or rearm) the auto-lock timer for the configured window.
    async fn arm_auto_lock(&self) {
        let minutes = self.settings.auto_lock_minutes;
        if minutes == 0 {
            debug!("auto-lock disabled");
            return;
        }

        let weak = self.weak_self.clone();
        self.autolock
            .schedule(Duration::from_secs(minutes * 60), async move {
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                if manager.is_locked().await {
                    debug!("auto-lock fired on an already locked vault");
                    return;
                }
                info!("auto-lock timeout reached, locking vault");
                if let Err(error) = manager.lock().await {
                    warn!(%error, "auto-lock failed to clear session");
                }
            })
            .await;
    }

    /// Argon2id derivation on the blocking pool; the KDF is CPU-bound
    /// and would stall the event loop otherwise.
    async fn derive_blocking(&self, password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        let params = self.settings.argon2_params();
        let mut password = password.as_bytes().to_vec();
        let salt = salt.to_vec();

        tokio::task::spawn_blocking(move || {
            let derived = derive_master_key_with_params(&password, &salt, &params);
            password.zeroize();
            derived
        })
        .await
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("KDF worker failed: {e}")))?
    }

    async fn hash_blocking(&self, password: &str, salt: &[u8]) -> Result<String> {
        let params = self.settings.argon2_params();
        let mut password = password.as_bytes().to_vec();
        let salt = salt.to_vec();

        tokio::task::spawn_blocking(move || {
            let hash = hash_master_password(&password, &salt, &params);
            password.zeroize();
            hash
        })
        .await
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("hash worker failed: {e}")))?
    }

    async fn verify_blocking(&self, password: &str, record: &VerifyRecord) -> Result<bool> {
        let params = self.settings.argon2_params();
        let mut password = password.as_bytes().to_vec();
        let hash = record.hash.clone();
        let salt = record.salt.clone();

        tokio::task::spawn_blocking(move || {
            let ok = verify_master_password(&password, &hash, &salt, &params);
            password.zeroize();
            ok
        })
        .await
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("verify worker failed: {e}")))?
    }
}
