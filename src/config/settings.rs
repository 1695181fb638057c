use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};

/// Host-level configuration, loaded from `credvault.toml`.
///
/// Every field has a sensible default so the vault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Minutes of inactivity before the vault locks itself (0 disables).
    #[serde(default = "default_auto_lock_minutes")]
    pub auto_lock_minutes: u64,

    /// How long a saved session stays valid, in minutes.
    #[serde(default = "default_session_max_age_minutes")]
    pub session_max_age_minutes: i64,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Base URL of the optional remote verification service.
    /// Absent means fully offline operation.
    #[serde(default)]
    pub remote_url: Option<String>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_auto_lock_minutes() -> u64 {
    15
}

fn default_session_max_age_minutes() -> i64 {
    480 // 8 hours
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_lock_minutes: default_auto_lock_minutes(),
            session_max_age_minutes: default_session_max_age_minutes(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            remote_url: None,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the host data directory.
    const FILE_NAME: &'static str = "credvault.toml";

    /// Load settings from `<data_dir>/credvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredVaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::kdf::Argon2Params {
        crate::crypto::kdf::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
