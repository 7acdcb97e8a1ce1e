//! FS Stat / Resize (C8): reports filesystem statistics and grows
//! reported capacity proportionally to peer-map size.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Config;

/// Snapshot handed to `statfs`.
#[derive(Debug, Clone, Copy)]
pub struct StatfsInfo {
    pub bsize: u64,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
}

/// Fixed total inode budget reported by `statfs`, independent of peer
/// count — only block capacity grows with the peer map.
const TOTAL_INODES: u64 = 1_000_000;

pub struct Statfs {
    bsize: u64,
    initial_blocks: u64,
    blocks: AtomicU64,
    used_blocks: AtomicU64,
    files_used: AtomicU64,
}

impl Statfs {
    pub fn new(config: &Config) -> Self {
        Self {
            bsize: config.block_size,
            initial_blocks: config.initial_blocks,
            blocks: AtomicU64::new(config.initial_blocks),
            used_blocks: AtomicU64::new(0),
            files_used: AtomicU64::new(0),
        }
    }

    /// `initial_size(peer_count + 1)` at mount time.
    pub fn initial_size(&self, peer_count: u64) {
        self.blocks.store((peer_count + 1) * self.initial_blocks, Ordering::Release);
    }

    /// Recomputes capacity as a linear function of peer count on every
    /// peer-map change event, never decreasing below the current used-block
    /// count.
    pub fn resize(&self, peer_count: u64) {
        let target = (peer_count + 1) * self.initial_blocks;
        let used = self.used_blocks.load(Ordering::Acquire);
        self.blocks.store(target.max(used), Ordering::Release);
    }

    /// Records how many blocks worth of content are currently stored, so
    /// [`Self::resize`] never shrinks capacity below what's in use.
    pub fn record_used_bytes(&self, bytes: u64) {
        let used_blocks = bytes.div_ceil(self.bsize.max(1));
        self.used_blocks.store(used_blocks, Ordering::Release);
    }

    pub fn record_file_count(&self, count: u64) {
        self.files_used.store(count, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatfsInfo {
        let blocks = self.blocks.load(Ordering::Acquire);
        let used = self.used_blocks.load(Ordering::Acquire);
        let bfree = blocks.saturating_sub(used);
        let files_used = self.files_used.load(Ordering::Acquire);
        StatfsInfo {
            bsize: self.bsize,
            blocks,
            bfree,
            bavail: bfree,
            files: TOTAL_INODES,
            ffree: TOTAL_INODES.saturating_sub(files_used),
        }
    }
}
