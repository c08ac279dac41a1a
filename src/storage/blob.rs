use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;

use super::{BlobHandle, BlobStore, StorageError};

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Blob names are relative paths like `<tenant>/<uuid>-<file>`; no `..`, no roots
fn validate_name(name: &str) -> Result<(), StorageError> {
    let path = Path::new(name);
    let plain = !name.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// Blobs as files under `<root>/<container>/`
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl AsRef<Path>, container: &str, base_url: &str) -> Self {
        Self {
            root: root.as_ref().join(container),
            base_url: format!("{}/{}", base_url.trim_end_matches('/'), container),
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<BlobHandle, StorageError> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Stored blob {} ({} bytes) at {}", name, bytes.len(), path.display());

        Ok(BlobHandle {
            name: name.to_string(),
            size: bytes.len() as u64,
            url: format!("{}/{}", self.base_url, name),
            checksum: sha256_hex(bytes),
        })
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct MemoryBlobStore {
    base_url: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<BlobHandle, StorageError> {
        validate_name(name)?;
        self.blobs.write().await.insert(name.to_string(), bytes.to_vec());
        Ok(BlobHandle {
            name: name.to_string(),
            size: bytes.len() as u64,
            url: format!("{}/{}", self.base_url, name),
            checksum: sha256_hex(bytes),
        })
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn names_cannot_escape_the_container() {
        assert!(validate_name("tenant/abc-config.json").is_ok());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("/absolute").is_err());
        assert!(validate_name("").is_err());
    }

    #[tokio::test]
    async fn filesystem_store_round_trip() {
        let root = std::env::temp_dir().join(format!("ffco-blobs-{}", uuid::Uuid::new_v4()));
        let store = FsBlobStore::new(&root, "uploads", "file://blobs");

        let handle = store.store("tenant/one.json", b"{}").await.unwrap();
        assert_eq!(handle.url, "file://blobs/uploads/tenant/one.json");
        assert_eq!(store.download("tenant/one.json").await.unwrap(), b"{}");
        assert!(matches!(store.download("tenant/missing.json").await, Err(StorageError::NotFound(_))));

        let _ = std::fs::remove_dir_all(root);
    }
}
