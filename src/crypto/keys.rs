//! In-memory master key wrapper.
//!
//! The derived vault key lives only inside `VaultManager` while the
//! vault is unlocked.  Wrapping it in `MasterKey` guarantees the bytes
//! are zeroed when the vault locks or the manager is dropped.

use zeroize::Zeroize;

use super::kdf::KEY_LEN;

/// A wrapper around a 32-byte vault key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to pass to encryption).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    // Never print key material, even accidentally via {:?}.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
