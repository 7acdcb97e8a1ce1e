//! VFS Adapter (C9): translates POSIX callbacks into Namespace Mirror and
//! File Monitor operations and POSIX error codes.
//!
//! The kernel FUSE binding itself is a separate concern; this is the
//! method surface such a binding would call into, already speaking
//! negative-errno-convertible [`Errno`] values via [`VfsResult`].

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;
use tracing::debug;

use crate::dht::{keys_location, DhtClient, Key};
use crate::errno::{Errno, VfsResult};
use crate::mirror::node::Attr;
use crate::mirror::{is_version_path, split_parent, Mirror};
use crate::monitor::FileMonitor;
use crate::stat::{Statfs, StatfsInfo};
use crate::version::VersionArchiver;

/// A `readdir` entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub attr: Attr,
}

pub struct Adapter {
    mirror: Arc<RwLock<Mirror>>,
    monitor: Arc<FileMonitor>,
    dht: Arc<dyn DhtClient>,
    archiver: Arc<VersionArchiver>,
    statfs: Arc<Statfs>,
}

impl Adapter {
    pub fn new(
        mirror: Arc<RwLock<Mirror>>,
        monitor: Arc<FileMonitor>,
        dht: Arc<dyn DhtClient>,
        archiver: Arc<VersionArchiver>,
        statfs: Arc<Statfs>,
    ) -> Self {
        Self { mirror, monitor, dht, archiver, statfs }
    }

    /// `access(path)`: always succeeds — access control is a non-goal.
    pub async fn access(&self, _path: &str) -> VfsResult<()> {
        Ok(())
    }

    pub async fn getattr(&self, path: &str) -> VfsResult<Attr> {
        let mirror = self.mirror.read().await;
        let id = mirror.find(path).ok_or(Errno::ENOENT)?;
        mirror.getattr(id)
    }

    pub async fn readdir(&self, path: &str) -> VfsResult<Vec<DirEntry>> {
        let mirror = self.mirror.read().await;
        let id = mirror.find(path).ok_or(Errno::ENOENT)?;
        let names = mirror.readdir(id)?;
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let child_path = join(path, &name);
            let child_id = mirror.find(&child_path).ok_or(Errno::ENOENT)?;
            entries.push(DirEntry { name, attr: mirror.getattr(child_id)? });
        }
        Ok(entries)
    }

    /// `open(path)`: lazily loads content from the DHT when the file's
    /// buffer has never been materialized.
    pub async fn open(&self, path: &str) -> VfsResult<()> {
        let id = {
            let mirror = self.mirror.read().await;
            mirror.find(path).ok_or(Errno::ENOENT)?
        };
        let needs_fetch = self.mirror.read().await.is_loaded(id)? == false;
        if needs_fetch {
            if let Ok(Some(data)) = self.dht.get(Key::for_path(path)).await {
                self.mirror.write().await.install_content(id, data)?;
            }
        }
        Ok(())
    }

    pub async fn read(&self, path: &str, offset: u64, size: usize) -> VfsResult<Vec<u8>> {
        let mirror = self.mirror.read().await;
        let id = mirror.find(path).ok_or(Errno::ENOENT)?;
        drop(mirror);
        self.mirror.write().await.read(id, offset, size)
    }

    pub async fn write(&self, path: &str, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let id = {
            let mirror = self.mirror.read().await;
            mirror.find(path).ok_or(Errno::ENOENT)?
        };
        let written = self.mirror.write().await.write(id, offset, data)?;
        self.refresh_monitor(path).await?;
        Ok(written)
    }

    /// `create(path, mode)`: file-vs-directory is decided elsewhere
    /// (`create` always makes a regular file; `mkdir` makes a directory) —
    /// the last-component heuristic is only used by the Syncer Listener
    /// when it has no separate `mkdir`/`create` signal to go on, not here.
    pub async fn create(&self, path: &str) -> VfsResult<()> {
        let (parent, name) = split_parent(path);
        self.mirror.write().await.mkfile(&parent, &name)?;
        self.monitor.add(path, Vec::new()).await;
        Ok(())
    }

    pub async fn mkdir(&self, path: &str) -> VfsResult<()> {
        let (parent, name) = split_parent(path);
        self.mirror.write().await.mkdir(&parent, &name)?;
        self.monitor.add(path, Vec::new()).await;
        Ok(())
    }

    pub async fn rmdir(&self, path: &str) -> VfsResult<()> {
        let mirror_ = self.mirror.read().await;
        let id = mirror_.find(path).ok_or(Errno::ENOENT)?;
        if !mirror_.node(id).ok_or(Errno::ENOENT)?.is_directory() {
            return Err(Errno::ENOTDIR);
        }
        drop(mirror_);
        self.mirror.write().await.delete(id)?;
        self.monitor.remove(path).await;
        Ok(())
    }

    /// `unlink(path)`: archives-then-removes — the version folder and
    /// chain are removed first so a later failure cannot orphan history.
    pub async fn unlink(&self, path: &str) -> VfsResult<()> {
        let id = {
            let mirror = self.mirror.read().await;
            mirror.find(path).ok_or(Errno::ENOENT)?
        };
        if self.archiver.chain_length(path).await > 0 {
            let _ = self.archiver.remove_versions(path).await;
        }
        self.mirror.write().await.delete(id)?;
        let key = Key::for_path(path);
        let _ = self.dht.remove(key).await;
        let _ = self.dht.remove_under(keys_location(), key).await;
        self.monitor.remove(path).await;
        Ok(())
    }

    /// `rename(old, new)`: detach/reattach in the mirror, proactively clear
    /// the old path's DHT entries, and start a fresh monitor record for the
    /// new path.
    pub async fn rename(&self, old: &str, new: &str) -> VfsResult<()> {
        let id = self.mirror.write().await.rename(old, new)?;
        let old_key = Key::for_path(old);
        let _ = self.dht.remove(old_key).await;
        let _ = self.dht.remove_under(keys_location(), old_key).await;
        self.monitor.remove(old).await;

        let mirror = self.mirror.read().await;
        let is_file = !mirror.node(id).ok_or(Errno::ENOENT)?.is_directory();
        let content = if is_file { mirror.content(id)?.map(|bytes| bytes.to_vec()) } else { None };
        drop(mirror);
        if let Some(content) = content {
            self.monitor.add(new, content).await;
        }
        Ok(())
    }

    pub async fn truncate(&self, path: &str, offset: u64) -> VfsResult<()> {
        let id = {
            let mirror = self.mirror.read().await;
            mirror.find(path).ok_or(Errno::ENOENT)?
        };
        self.mirror.write().await.truncate(id, offset)?;
        self.refresh_monitor(path).await?;
        Ok(())
    }

    /// `symlink(path, target)`: symlinks have no write-coalesced content,
    /// so no monitor record is created for them — monitored records exist
    /// to coalesce file writes, and a symlink's target is set once, at
    /// creation.
    pub async fn symlink(&self, path: &str, target: &str) -> VfsResult<()> {
        let (parent, name) = split_parent(path);
        self.mirror.write().await.symlink(&parent, &name, target)?;
        Ok(())
    }

    pub async fn readlink(&self, path: &str) -> VfsResult<String> {
        let mirror = self.mirror.read().await;
        let id = mirror.find(path).ok_or(Errno::ENOENT)?;
        match &mirror.node(id).ok_or(Errno::ENOENT)?.kind {
            crate::mirror::node::Kind::Symlink { target, .. } => Ok(target.clone()),
            _ => Err(Errno::EINVAL),
        }
    }

    pub async fn utimens(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> VfsResult<()> {
        let id = {
            let mirror = self.mirror.read().await;
            mirror.find(path).ok_or(Errno::ENOENT)?
        };
        self.mirror.write().await.set_times(id, atime, mtime)
    }

    pub async fn statfs(&self) -> StatfsInfo {
        self.statfs.snapshot()
    }

    /// `chmod`/`chown`/`bmap`: no-ops — permissions are not persisted, and
    /// should stay no-ops until the DHT schema grows an attributes slot.
    pub async fn chmod(&self, _path: &str, _mode: u32) -> VfsResult<()> {
        Ok(())
    }

    pub async fn chown(&self, _path: &str, _uid: u32, _gid: u32) -> VfsResult<()> {
        Ok(())
    }

    pub async fn bmap(&self, _path: &str) -> VfsResult<()> {
        Ok(())
    }

    async fn refresh_monitor(&self, path: &str) -> VfsResult<()> {
        if is_version_path(path) {
            return Ok(());
        }
        let mirror = self.mirror.read().await;
        let id = mirror.find(path).ok_or(Errno::ENOENT)?;
        let content = mirror.content(id)?.map(|bytes| bytes.to_vec()).unwrap_or_default();
        drop(mirror);
        debug!(path, bytes = content.len(), "refreshing monitor record");
        self.monitor.add(path, content).await;
        Ok(())
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}
