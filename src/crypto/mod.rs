//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - The zeroizing in-memory key wrapper (`keys`)
//! - Independent master-password hashing/verification (`verify`)
//!
//! No business logic lives here; the vault layer decides when each
//! primitive is used.

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod verify;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt_data, decrypt_data, generate_salt, ...};
pub use encryption::{decrypt_data, encrypt_data, EncryptedPayload, IV_LEN};
pub use kdf::{derive_master_key_with_params, generate_salt, Argon2Params, KEY_LEN, SALT_LEN};
pub use keys::MasterKey;
pub use verify::{hash_master_password, verify_master_password};
