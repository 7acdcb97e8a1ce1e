//! Version Archiver (C2): maintains, per path, a chronologically ordered
//! chain of prior content blobs in the DHT and a companion on-mount
//! version directory exposing each historical version as a readable file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::dht::{DhtClient, DhtResult, Key, VersionId};
use crate::mirror::VERSION_DIR_MARKER;

pub struct VersionArchiver {
    dht: Arc<dyn DhtClient>,
    mount_point: PathBuf,
    /// Length of the version chain already written for a given content
    /// key, so the next call to [`Self::archive`] knows which
    /// [`VersionId`] to use. The DHT itself has no "list versions"
    /// primitive, so the archiver is the sole source of truth for chain
    /// length.
    chain_len: Mutex<HashMap<Key, u64>>,
}

impl VersionArchiver {
    pub fn new(dht: Arc<dyn DhtClient>, mount_point: PathBuf) -> Self {
        Self { dht, mount_point, chain_len: Mutex::new(HashMap::new()) }
    }

    /// Derives `V(p)` from a stable function of `p`.
    pub fn version_folder(&self, path: &str) -> PathBuf {
        self.mount_point.join(VERSION_DIR_MARKER).join(format!("{:016x}", Key::for_path(path).0))
    }

    /// Appends `old_blob` to the versioned DHT chain for `path` and
    /// materializes a new file inside `V(path)` named by the chain index.
    ///
    /// Callers are expected to only invoke this when the prior content was
    /// non-empty and `path` is not a directory.
    pub async fn archive(&self, path: &str, old_blob: Vec<u8>) -> DhtResult<VersionId> {
        let key = Key::for_path(path);
        let index = {
            let mut chain_len = self.chain_len.lock().await;
            let next = chain_len.entry(key).or_insert(0);
            let index = *next;
            *next += 1;
            index
        };
        let version = VersionId(index);
        self.dht.put_versioned(key, version, old_blob.clone()).await?;

        let folder = self.version_folder(path);
        if let Err(error) = tokio::fs::create_dir_all(&folder).await {
            warn!(%path, %error, "failed to create version folder");
        } else if let Err(error) = tokio::fs::write(folder.join(index.to_string()), &old_blob).await {
            warn!(%path, %error, "failed to materialize version file");
        }
        Ok(version)
    }

    /// Number of historical entries archived for `path` so far.
    pub async fn chain_length(&self, path: &str) -> u64 {
        *self.chain_len.lock().await.get(&Key::for_path(path)).unwrap_or(&0)
    }

    /// Deletes every chain entry for `path` and removes `V(path)`.
    /// Invoked first on `unlink` so a later deletion of `path` itself
    /// cannot orphan its history.
    pub async fn remove_versions(&self, path: &str) -> DhtResult<()> {
        let key = Key::for_path(path);
        let count = {
            let mut chain_len = self.chain_len.lock().await;
            chain_len.remove(&key).unwrap_or(0)
        };
        for index in 0..count {
            self.dht.remove_versioned(key, VersionId(index)).await?;
        }
        let folder = self.version_folder(path);
        if let Err(error) = tokio::fs::remove_dir_all(&folder).await {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(%path, %error, "failed to remove version folder");
            }
        }
        Ok(())
    }
}
