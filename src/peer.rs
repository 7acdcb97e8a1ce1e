//! Peer (A3): owns C1–C9 plus the Bootstrap Client, wires the Event Bus
//! subscribers, and drives the mount/unmount lifecycle.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapter::Adapter;
use crate::bootstrap::{BootstrapClient, BootstrapError, PeerEndpoint};
use crate::bus::EventBus;
use crate::config::Config;
use crate::dht::{DhtClient, PeerMapEvent};
use crate::mirror::Mirror;
use crate::monitor::{FileMonitor, MonitorConfig};
use crate::stat::Statfs;
use crate::syncer::SyncerListener;
use crate::version::VersionArchiver;
use crate::writer::WriterListener;

/// Bound on how long [`Peer::unmount`] waits for the Monitor to finish its
/// in-flight tick before force-aborting it: await graceful termination,
/// then force-cancel outstanding tasks.
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(3);

pub struct Peer {
    pub adapter: Arc<Adapter>,
    pub statfs: Arc<Statfs>,
    dht: Arc<dyn DhtClient>,
    config: Config,
    bootstrap: Option<Arc<BootstrapClient>>,
    monitor: Arc<FileMonitor>,
    syncer: Arc<SyncerListener>,
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
    syncer_handle: Mutex<Option<JoinHandle<()>>>,
    keepalive_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Peer {
    /// Mounts a peer onto `dht`: joins the bootstrap rendezvous (if
    /// configured), wires the Event Bus subscribers, and starts the Monitor
    /// and Syncer background tasks.
    ///
    /// A bootstrap join failure is fatal unless `start_with_bootstrap_server`
    /// is set, in which case this peer becomes its own bootstrap peer and
    /// the failure is only logged.
    pub async fn mount(
        config: Config,
        dht: Arc<dyn DhtClient>,
        start_with_bootstrap_server: bool,
    ) -> Result<Arc<Self>, BootstrapError> {
        let bootstrap = match &config.rendezvous_url {
            Some(url) => {
                let me = PeerEndpoint { address: dht.local_ip().to_string(), port: config.port.to_string() };
                let client = Arc::new(BootstrapClient::new(url.clone(), me));
                match client.fetch_peers().await {
                    Ok(_) => {
                        if let Err(error) = client.keepalive().await {
                            warn!(%error, "initial bootstrap registration failed");
                        }
                        Some(client)
                    }
                    Err(error) if start_with_bootstrap_server => {
                        warn!(%error, "bootstrap rendezvous unreachable, starting as own bootstrap peer");
                        None
                    }
                    Err(error) => {
                        error!(%error, "failed to join any known peer");
                        return Err(error);
                    }
                }
            }
            None => None,
        };

        let statfs = Arc::new(Statfs::new(&config));
        statfs.initial_size(1);
        let peer_count = Arc::new(std::sync::atomic::AtomicU64::new(1));
        {
            let statfs = statfs.clone();
            let peer_count = peer_count.clone();
            dht.peer_map_change_listener(Box::new(move |event: PeerMapEvent| {
                let delta = event.added.len() as i64 - event.removed.len() as i64;
                let updated = (peer_count.load(std::sync::atomic::Ordering::Acquire) as i64 + delta).max(0) as u64;
                peer_count.store(updated, std::sync::atomic::Ordering::Release);
                statfs.resize(updated);
            }));
        }

        let mirror = Arc::new(RwLock::new(Mirror::new()));
        let bus = Arc::new(EventBus::new());
        let archiver = Arc::new(VersionArchiver::new(dht.clone(), config.mount_point.clone()));

        bus.register(Arc::new(WriterListener::new(dht.clone(), archiver.clone(), mirror.clone(), statfs.clone())))
            .await;
        let syncer = SyncerListener::new(dht.clone(), mirror.clone());
        bus.register(syncer.clone()).await;

        let monitor_config = MonitorConfig {
            n_initial: config.monitor_initial_countdown,
            tick_interval: config.monitor_tick_interval(),
            n_idle: config.monitor_idle_eviction,
        };
        let monitor = FileMonitor::new(monitor_config, bus);
        let monitor_handle = monitor.clone().spawn();
        let syncer_handle = syncer.clone().spawn(config.monitor_tick_interval() * 5);

        let keepalive_handle = bootstrap.clone().map(|client| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
                loop {
                    interval.tick().await;
                    if let Err(error) = client.keepalive().await {
                        warn!(%error, "keepalive refresh failed");
                    }
                }
            })
        });

        let adapter = Arc::new(Adapter::new(mirror, monitor.clone(), dht.clone(), archiver, statfs.clone()));
        info!(mount_point = %config.mount_point.display(), "peer mounted");

        Ok(Arc::new(Self {
            adapter,
            statfs,
            dht,
            config,
            bootstrap,
            monitor,
            syncer,
            monitor_handle: Mutex::new(Some(monitor_handle)),
            syncer_handle: Mutex::new(Some(syncer_handle)),
            keepalive_handle: Mutex::new(keepalive_handle),
        }))
    }

    /// Unmount sequencing: terminate the Monitor, await it under a bound,
    /// force-abort on timeout, remove the mount-point directory from local
    /// disk (version-folder tree included), then deregister from the
    /// bootstrap rendezvous. Shutdown-path errors are best-effort: logged,
    /// never propagated.
    pub async fn unmount(&self) {
        self.monitor.terminate();
        if let Some(handle) = self.monitor_handle.lock().await.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("monitor did not terminate within grace period, aborting");
                abort.abort();
            }
        }

        self.syncer.terminate();
        if let Some(handle) = self.syncer_handle.lock().await.take() {
            handle.abort();
        }

        if let Some(handle) = self.keepalive_handle.lock().await.take() {
            handle.abort();
        }

        if let Err(error) = tokio::fs::remove_dir_all(&self.config.mount_point).await {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(%error, "failed to remove mount point on unmount");
            }
        }

        if let Some(bootstrap) = &self.bootstrap {
            bootstrap.deregister().await;
        }

        self.dht.shutdown().await;
        info!("peer unmounted");
    }
}
