//! Independent master-password verification hash.
//!
//! The vault key is derived from the master password and the vault's
//! own salt.  Separately, a verification hash is computed under an
//! independent salt so the password can be checked without touching the
//! vault: a fast local pre-check before the expensive unlock, and the
//! only artifact ever sent to a remote (the raw password never leaves
//! the process).
//!
//! Passing the verification check is not proof of correctness on its
//! own: unlock still has to decrypt the vault, which guards against a
//! verification-hash / vault-salt mismatch bug.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::errors::{CredVaultError, Result};

use super::kdf::{derive_master_key_with_params, Argon2Params};

/// Hash a master password under its own salt, for verification only.
///
/// Returns the base64-encoded Argon2id digest.
pub fn hash_master_password(
    password: &[u8],
    salt: &[u8],
    params: &Argon2Params,
) -> Result<String> {
    let digest = derive_master_key_with_params(password, salt, params)?;
    Ok(BASE64.encode(digest))
}

/// Check a master password against a stored verification hash.
///
/// Comparison is constant-time so the check leaks nothing about how
/// close a wrong guess was.
pub fn verify_master_password(
    password: &[u8],
    expected_hash: &str,
    salt: &[u8],
    params: &Argon2Params,
) -> Result<bool> {
    let expected = BASE64
        .decode(expected_hash)
        .map_err(|e| CredVaultError::Serialization(format!("verification hash: {e}")))?;

    let digest = derive_master_key_with_params(password, salt, params)?;

    Ok(digest.ct_eq(&expected).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::generate_salt;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn correct_password_verifies() {
        let salt = generate_salt();
        let hash = hash_master_password(b"Sup3r$ecret!", &salt, &fast_params()).unwrap();
        let ok = verify_master_password(b"Sup3r$ecret!", &hash, &salt, &fast_params()).unwrap();
        assert!(ok);
    }

    #[test]
    fn wrong_password_fails_verification() {
        let salt = generate_salt();
        let hash = hash_master_password(b"Sup3r$ecret!", &salt, &fast_params()).unwrap();
        let ok = verify_master_password(b"wrong", &hash, &salt, &fast_params()).unwrap();
        assert!(!ok);
    }

    #[test]
    fn hash_depends_on_salt() {
        let h1 = hash_master_password(b"pw", &generate_salt(), &fast_params()).unwrap();
        let h2 = hash_master_password(b"pw", &generate_salt(), &fast_params()).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        let salt = generate_salt();
        let result = verify_master_password(b"pw", "not base64!!!", &salt, &fast_params());
        assert!(result.is_err());
    }
}
