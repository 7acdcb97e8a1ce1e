//! Writer Listener (C6): on `CompleteWrite`, archives prior content and
//! stores new content and path into the DHT.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::bus::{CompleteWrite, Listener};
use crate::dht::{keys_location, DhtClient, Key};
use crate::mirror::Mirror;
use crate::stat::Statfs;
use crate::version::VersionArchiver;

pub struct WriterListener {
    dht: Arc<dyn DhtClient>,
    archiver: Arc<VersionArchiver>,
    mirror: Arc<RwLock<Mirror>>,
    statfs: Arc<Statfs>,
}

impl WriterListener {
    pub fn new(
        dht: Arc<dyn DhtClient>,
        archiver: Arc<VersionArchiver>,
        mirror: Arc<RwLock<Mirror>>,
        statfs: Arc<Statfs>,
    ) -> Self {
        Self { dht, archiver, mirror, statfs }
    }

    async fn is_directory(&self, path: &str) -> bool {
        let mirror = self.mirror.read().await;
        mirror.find(path).and_then(|id| mirror.node(id)).map(|node| node.is_directory()).unwrap_or(false)
    }
}

#[async_trait]
impl Listener for WriterListener {
    /// On each flushed write:
    /// 1. If the prior stored blob is non-empty and `path` is not a
    ///    directory, archive it.
    /// 2. `put(K_c(path), new_content)`; `put_path(K_p(path), path_string)`.
    /// 3. On any DHT error, log and surface nothing — the local write is
    ///    already considered successful.
    async fn handle(&self, event: CompleteWrite) {
        let key = Key::for_path(&event.path);

        if !self.is_directory(&event.path).await {
            match self.dht.get(key).await {
                Ok(Some(prior)) if !prior.is_empty() => {
                    if let Err(error) = self.archiver.archive(&event.path, prior).await {
                        warn!(path = %event.path, %error, "failed to archive prior content");
                    }
                }
                Ok(_) => {}
                Err(error) => warn!(path = %event.path, %error, "failed to read prior content for archiving"),
            }
        }

        self.statfs.record_used_bytes(event.content.len() as u64);

        if let Err(error) = self.dht.put(key, event.content.clone()).await {
            warn!(path = %event.path, %error, "DHT put failed, local write stands");
            return;
        }
        if let Err(error) = self.dht.put_under(keys_location(), key, event.path.clone().into_bytes()).await {
            warn!(path = %event.path, %error, "DHT path-index put failed, local write stands");
        }
    }
}
