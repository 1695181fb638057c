//! Credential types stored inside the vault.
//!
//! A `Credential` only ever exists in plaintext while the vault is
//! unlocked; on disk the whole list is one AEAD-encrypted blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single stored login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque unique identifier, assigned on creation.
    pub id: Uuid,

    /// Display name (e.g. "GitHub").
    #[serde(default)]
    pub name: String,

    /// The site this login belongs to (e.g. "github.com").
    pub domain: String,

    pub username: String,
    pub password: String,

    #[serde(default)]
    pub notes: String,

    /// Pinned credentials sort to the top in UIs.
    #[serde(default)]
    pub pinned: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input shape for adding a credential.
///
/// `domain` and `password` are required; everything else defaults.
/// Validation happens in the vault manager, not here, so a malformed
/// message payload still deserializes and produces a proper
/// validation failure instead of a protocol error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub pinned: bool,
}

/// Field-by-field merge shape for updating a credential.
///
/// `None` leaves the existing value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialChanges {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
    pub pinned: Option<bool>,
}

impl Credential {
    /// Build a credential from a draft, minting the id and timestamps.
    pub fn from_draft(draft: CredentialDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            domain: draft.domain,
            username: draft.username,
            password: draft.password,
            notes: draft.notes,
            pinned: draft.pinned,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge non-`None` fields from `changes` and bump `updated_at`.
    pub fn apply(&mut self, changes: CredentialChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(domain) = changes.domain {
            self.domain = domain;
        }
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(password) = changes.password {
            self.password = password;
        }
        if let Some(notes) = changes.notes {
            self.notes = notes;
        }
        if let Some(pinned) = changes.pinned {
            self.pinned = pinned;
        }
        self.updated_at = Utc::now();
    }

    /// Case-insensitive substring match over name, domain and username.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q)
            || self.domain.to_lowercase().contains(&q)
            || self.username.to_lowercase().contains(&q)
    }
}

/// The decrypted vault contents, in memory only while unlocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultData {
    /// Insertion-ordered credential list.
    pub passwords: Vec<Credential>,

    /// Payload schema version (for future migrations).
    pub version: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultData {
    /// Current payload schema version.
    pub const VERSION: u32 = 1;

    /// An empty vault created now.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            passwords: Vec::new(),
            version: Self::VERSION,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(domain: &str, username: &str) -> CredentialDraft {
        CredentialDraft {
            domain: domain.to_string(),
            username: username.to_string(),
            password: "x".to_string(),
            ..CredentialDraft::default()
        }
    }

    #[test]
    fn from_draft_mints_unique_ids() {
        let a = Credential::from_draft(draft("github.com", "a@b.com"));
        let b = Credential::from_draft(draft("github.com", "a@b.com"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut cred = Credential::from_draft(draft("github.com", "a@b.com"));
        let original_domain = cred.domain.clone();

        cred.apply(CredentialChanges {
            username: Some("new@b.com".to_string()),
            ..CredentialChanges::default()
        });

        assert_eq!(cred.username, "new@b.com");
        assert_eq!(cred.domain, original_domain);
    }

    #[test]
    fn matches_is_case_insensitive() {
        let mut cred = Credential::from_draft(draft("GitHub.com", "Alice@example.com"));
        cred.name = "Work GitHub".to_string();

        assert!(cred.matches("github"));
        assert!(cred.matches("ALICE"));
        assert!(cred.matches("work"));
        assert!(!cred.matches("gitlab"));
    }

    #[test]
    fn vault_data_roundtrips_through_json() {
        let mut data = VaultData::empty();
        data.passwords
            .push(Credential::from_draft(draft("github.com", "a@b.com")));

        let json = serde_json::to_vec(&data).unwrap();
        let back: VaultData = serde_json::from_slice(&json).unwrap();

        assert_eq!(back.passwords.len(), 1);
        assert_eq!(back.passwords[0].id, data.passwords[0].id);
        assert_eq!(back.version, VaultData::VERSION);
    }
}
