//! File-backed storage backend.
//!
//! Models the host's durable storage area: one file per key under a
//! directory chosen by the host.  Writes go to a temp file in the same
//! directory and are renamed into place, so readers never see a
//! half-written value and a crashed write leaves the old value intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::errors::{CredVaultError, Result};

use super::backend::{validate_key, StorageBackend};

/// Durable key-value store rooted at a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`.  The directory is created on the
    /// first write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StorageBackend for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.path_for(key);

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CredVaultError::Storage(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);

        // Atomic write: write to a temp file, then rename.  The temp
        // file is in the same directory so rename is guaranteed to be
        // atomic on the same filesystem.
        let tmp_path = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp_path, value).await?;
        fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredVaultError::Storage(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn set_get_remove_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());

        assert_eq!(store.get("vault.record").await.unwrap(), None);

        store.set("vault.record", b"{\"v\":1}").await.unwrap();
        assert_eq!(
            store.get("vault.record").await.unwrap(),
            Some(b"{\"v\":1}".to_vec())
        );

        store.remove("vault.record").await.unwrap();
        assert_eq!(store.get("vault.record").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_fully() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());

        store.set("k", b"a long first value").await.unwrap();
        store.set("k", b"short").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"short".to_vec()));
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());

        assert!(store.set("../outside", b"x").await.is_err());
        assert!(store.get("a/b").await.is_err());
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());

        store.set("k", b"v").await.unwrap();

        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(tmp.path()).await.unwrap();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["k.json".to_string()]);
    }
}
