//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt_data` generates a fresh random 12-byte IV and
//! returns it alongside the ciphertext.  The IV is kept separate (not
//! prepended) because the durable vault record stores `ciphertext` and
//! `iv` as distinct fields.
//!
//! A failed auth-tag check on decryption is the wrong-password signal:
//! there is no other way to tell a bad key from tampered data, and the
//! caller must treat both the same.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{CredVaultError, Result};

/// Size of the AES-256-GCM IV in bytes.
pub const IV_LEN: usize = 12;

/// Ciphertext plus the IV it was produced under.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LEN],
}

/// Encrypt `plaintext` with a 32-byte `key`.
///
/// A new random IV is generated on every call; an IV is never reused
/// under the same key.
pub fn encrypt_data(key: &[u8], plaintext: &[u8]) -> Result<EncryptedPayload> {
    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // Generate a random 12-byte IV.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // Encrypt and authenticate the plaintext.
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CredVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&nonce);

    Ok(EncryptedPayload { ciphertext, iv })
}

/// Decrypt data that was produced by `encrypt_data`.
///
/// Fails with `DecryptionFailed` when the auth tag does not verify
/// (wrong key, tampered ciphertext, or corrupted IV).
pub fn decrypt_data(key: &[u8], ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    // The IV must be exactly one GCM nonce long.
    if iv.len() != IV_LEN {
        return Err(CredVaultError::DecryptionFailed);
    }

    let nonce = Nonce::from_slice(iv);

    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CredVaultError::DecryptionFailed)?;

    // Decrypt and verify the auth tag.
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CredVaultError::DecryptionFailed)?;

    Ok(plaintext)
}
