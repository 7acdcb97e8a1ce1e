use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use meshfs::config::Config;
use meshfs::dht::InMemoryDht;
use meshfs::peer::Peer;
use tempfile::TempDir;

/// A config with tight monitor timings so tests don't wait long for a
/// quiescent burst to flush.
pub fn fast_config(mount_point: PathBuf) -> Config {
    Config {
        mount_point,
        port: 0,
        start_cli: false,
        block_size: 4000,
        initial_blocks: 10,
        monitor_initial_countdown: 2,
        monitor_tick_interval_ms: 20,
        monitor_idle_eviction: 3,
        rendezvous_url: None,
    }
}

pub struct Fixture {
    pub peer: Arc<Peer>,
    pub dht: Arc<InMemoryDht>,
    _mount_point: TempDir,
}

impl Fixture {
    pub async fn new() -> Self {
        let mount_point = TempDir::new().expect("create temp mount point");
        let dht = InMemoryDht::new(Ipv4Addr::LOCALHOST.into());
        Self::with_dht(mount_point, dht).await
    }

    /// Mounts a second peer sharing the same in-memory store — the
    /// in-process analogue of two real peers converged over the DHT
    /// overlay.
    pub async fn join(dht: Arc<InMemoryDht>) -> Self {
        let mount_point = TempDir::new().expect("create temp mount point");
        Self::with_dht(mount_point, dht).await
    }

    async fn with_dht(mount_point: TempDir, dht: Arc<InMemoryDht>) -> Self {
        let config = fast_config(mount_point.path().to_path_buf());
        let peer = Peer::mount(config, dht.clone(), true).await.expect("mount peer");
        Self { peer, dht, _mount_point: mount_point }
    }

    /// Waits long enough for a quiescent write burst to flush through the
    /// File Monitor and Writer Listener (roughly `N_initial * T_tick`).
    pub async fn flush(&self) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    /// Waits long enough for the Syncer Listener's periodic tick to run at
    /// least once.
    pub async fn sync_cycle(&self) {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
