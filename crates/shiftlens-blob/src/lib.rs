// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-addressed filesystem blob store.
//!
//! Screenshot bytes are stored once under a SHA-256 derived key of the form
//! `aa/bb/<hex><ext>`. Re-uploading identical bytes returns the existing key,
//! which is what makes `object_key` usable as the idempotency anchor for
//! image appends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use shiftlens_core::{ObjectStore, ShiftlensError};

/// Filesystem implementation of [`ObjectStore`].
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory blobs are written under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ShiftlensError> {
        // Keys are fanned-out relative paths; refuse anything that could
        // escape the root.
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(ShiftlensError::NotFound(format!("object key `{key}`")));
        }
        Ok(self.root.join(key))
    }
}

/// Derive the object key for a byte payload: two fan-out directories from
/// the SHA-256 prefix, then the full digest plus a normalized extension.
pub fn object_key_for(bytes: &[u8], extension: &str) -> String {
    let digest = Sha256::digest(bytes);
    let hex = format!("{digest:x}");
    format!("{}/{}/{}{}", &hex[..2], &hex[2..4], hex, normalize_extension(extension))
}

/// Lowercase the extension, strip any leading dot, and fall back to `jpg`
/// when it contains anything but ASCII alphanumerics.
fn normalize_extension(extension: &str) -> String {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        ".jpg".to_string()
    } else {
        format!(".{ext}")
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<String, ShiftlensError> {
        let key = object_key_for(bytes, extension);
        let path = self.root.join(&key);

        if fs::try_exists(&path)
            .await
            .map_err(|e| ShiftlensError::Internal(format!("blob stat failed for `{key}`: {e}")))?
        {
            debug!(key = %key, "blob already stored");
            return Ok(key);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ShiftlensError::Internal(format!("blob directory create failed for `{key}`: {e}"))
            })?;
        }

        // Write to a sibling temp file and rename so a crash never leaves a
        // truncated blob behind a valid key.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| ShiftlensError::Internal(format!("blob write failed for `{key}`: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ShiftlensError::Internal(format!("blob rename failed for `{key}`: {e}")))?;

        debug!(key = %key, size = bytes.len(), "blob stored");
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ShiftlensError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ShiftlensError::NotFound(format!("object key `{key}`")))
            }
            Err(e) => Err(ShiftlensError::Internal(format!(
                "blob read failed for `{key}`: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn key_is_fanned_out_hex_with_extension() {
        let key = object_key_for(b"schedule screenshot", "jpg");
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 2);
        assert!(parts[2].ends_with(".jpg"));
        assert!(parts[2].starts_with(parts[0]));
        assert!(parts[2][2..].starts_with(parts[1]));
    }

    #[test]
    fn same_bytes_same_key_different_bytes_different_key() {
        let a = object_key_for(b"monday", "png");
        let b = object_key_for(b"monday", "png");
        let c = object_key_for(b"tuesday", "png");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn extension_is_normalized() {
        assert!(object_key_for(b"x", ".PNG").ends_with(".png"));
        assert!(object_key_for(b"x", "").ends_with(".jpg"));
        assert!(object_key_for(b"x", "../evil").ends_with(".jpg"));
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let key = store.put(b"shift 07:00-15:00", "jpg").await.unwrap();
        let bytes = store.get(&key).await.unwrap();
        assert_eq!(bytes, b"shift 07:00-15:00");
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let first = store.put(b"same bytes", "png").await.unwrap();
        let second = store.put(b"same bytes", "png").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_unknown_key_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let err = store.get("aa/bb/doesnotexist.jpg").await.unwrap_err();
        assert!(matches!(err, ShiftlensError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let err = store.get("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ShiftlensError::NotFound(_)));
    }
}
