//! Syncer Listener (C7): periodically reconciles remote paths from the DHT
//! into the Namespace Mirror.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, warn};

use crate::bus::{CompleteWrite, Listener};
use crate::dht::{keys_location, DhtClient, Key};
use crate::mirror::{is_version_path, Mirror};

/// Periodically, and on every `CompleteWrite`, reconciles remote paths
/// into the mirror.
pub struct SyncerListener {
    dht: Arc<dyn DhtClient>,
    mirror: Arc<RwLock<Mirror>>,
    stop: AtomicBool,
    stopped: Notify,
}

impl SyncerListener {
    pub fn new(dht: Arc<dyn DhtClient>, mirror: Arc<RwLock<Mirror>>) -> Arc<Self> {
        Arc::new(Self { dht, mirror, stop: AtomicBool::new(false), stopped: Notify::new() })
    }

    /// One reconciliation pass:
    /// 1. Enumerate paths via `get_keys(K_keys)`.
    /// 2. Materialize any remote path not present locally.
    /// 3. Fetch content for any local file whose buffer is still unloaded.
    pub async fn sync_once(&self) {
        let remote = match self.dht.get_all_under(keys_location()).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(%error, "failed to enumerate remote paths, skipping this cycle");
                return;
            }
        };

        {
            let mut mirror = self.mirror.write().await;
            for raw_path in remote.into_values() {
                let path = match String::from_utf8(raw_path) {
                    Ok(path) => path,
                    Err(error) => {
                        warn!(%error, "remote path entry failed to parse, skipping");
                        continue;
                    }
                };
                if is_version_path(&path) {
                    continue;
                }
                if mirror.find(&path).is_none() {
                    if let Err(error) = mirror.materialize(&path) {
                        warn!(%path, ?error, "failed to materialize remote path");
                    } else {
                        debug!(%path, "materialized remote path");
                    }
                }
            }
        }

        self.fetch_unloaded().await;
    }

    async fn fetch_unloaded(&self) {
        let unloaded = self.mirror.read().await.unloaded_files();
        for (id, path) in unloaded {
            let key = Key::for_path(&path);
            match self.dht.get(key).await {
                Ok(Some(data)) => {
                    let mut mirror = self.mirror.write().await;
                    if let Err(error) = mirror.install_content(id, data) {
                        warn!(%path, ?error, "failed to install fetched content");
                    } else {
                        debug!(%path, "fetched and installed remote content");
                    }
                }
                Ok(None) => {}
                Err(error) => warn!(%path, %error, "failed to fetch remote content, will retry next cycle"),
            }
        }
    }

    /// Drives periodic reconciliation on its own task until
    /// [`Self::terminate`] is called.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if self.stop.load(Ordering::Acquire) {
                            break;
                        }
                        self.sync_once().await;
                    }
                    _ = self.stopped.notified() => break,
                }
            }
        })
    }

    pub fn terminate(&self) {
        self.stop.store(true, Ordering::Release);
        self.stopped.notify_one();
    }
}

#[async_trait]
impl Listener for SyncerListener {
    async fn handle(&self, _event: CompleteWrite) {
        self.sync_once().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::{DhtClient, InMemoryDht};
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn sync_once_materializes_remote_path_and_fetches_content() {
        let dht = InMemoryDht::new(Ipv4Addr::LOCALHOST.into());
        let key = Key::for_path("/shared.txt");
        dht.put(key, b"abc".to_vec()).await.unwrap();
        dht.put_under(keys_location(), key, b"/shared.txt".to_vec()).await.unwrap();

        let mirror = Arc::new(RwLock::new(Mirror::new()));
        let syncer = SyncerListener::new(dht, mirror.clone());
        syncer.sync_once().await;

        let mirror = mirror.read().await;
        let id = mirror.find("/shared.txt").expect("path materialized");
        assert_eq!(mirror.content(id).unwrap(), Some(b"abc".as_slice()));
    }

    #[tokio::test]
    async fn sync_once_skips_version_folder_entries() {
        let dht = InMemoryDht::new(Ipv4Addr::LOCALHOST.into());
        let key = Key::for_path("/v.txt/.versions/0");
        dht.put_under(keys_location(), key, b"/v.txt/.versions/0".to_vec()).await.unwrap();

        let mirror = Arc::new(RwLock::new(Mirror::new()));
        let syncer = SyncerListener::new(dht, mirror.clone());
        syncer.sync_once().await;

        assert!(mirror.read().await.find("/v.txt/.versions/0").is_none());
    }
}
