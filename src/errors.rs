use thiserror::Error;
use uuid::Uuid;

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Invalid master password")]
    InvalidCredentials,

    #[error("Vault is locked. Please unlock first.")]
    VaultLocked,

    #[error("Vault already initialized with a master password")]
    AlreadyInitialized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Credential '{0}' not found")]
    CredentialNotFound(Uuid),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Message protocol errors ---
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    // --- Remote errors ---
    #[error("Remote verification service unavailable: {0}")]
    RemoteUnavailable(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
