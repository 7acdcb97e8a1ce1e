//! File Monitor (C4): per-path debounce/coalescing engine turning a stream
//! of write/rename/truncate notifications into [`CompleteWrite`] events.
//!
//! Kernel writes arrive in block-sized fragments; committing each fragment
//! to the DHT would both amplify cost and produce version history of no
//! value. Coalescing into one `CompleteWrite` per quiescent burst is the
//! design's central performance contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

use crate::bus::{CompleteWrite, EventBus};

/// Per-path entry tracking a monitored file's coalescing state.
#[derive(Debug, Clone)]
struct Record {
    content_snapshot: Vec<u8>,
    countdown: u32,
    dirty_flag: bool,
    /// Consecutive ticks the record has been clean; a purely-clean record
    /// is eligible for garbage collection after `n_idle` ticks.
    idle_ticks: u32,
}

/// Tunables controlling the coalescing window: `monitor_initial_countdown`,
/// `monitor_tick_interval`, `monitor_idle_eviction`.
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub n_initial: u32,
    pub tick_interval: Duration,
    pub n_idle: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { n_initial: 3, tick_interval: Duration::from_millis(200), n_idle: 5 }
    }
}

/// Whole-map-granularity atomicity (insert, remove, and tick serialize
/// with one another) is satisfied by a single `tokio::sync::Mutex` over
/// the entire record map, rather than a sharded concurrent map.
pub struct FileMonitor {
    records: Mutex<HashMap<String, Record>>,
    config: MonitorConfig,
    bus: Arc<EventBus>,
    stop: AtomicBool,
    stopped: Notify,
}

impl FileMonitor {
    pub fn new(config: MonitorConfig, bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            config,
            bus,
            stop: AtomicBool::new(false),
            stopped: Notify::new(),
        })
    }

    /// `add(path, content)`: insert or replace the record for `path`,
    /// resetting its countdown; `dirty_flag` is set unless `content`
    /// exactly matches the previously observed snapshot.
    pub async fn add(&self, path: &str, content: Vec<u8>) {
        let mut records = self.records.lock().await;
        let dirty = records.get(path).map(|record| record.content_snapshot != content).unwrap_or(true);
        records.insert(
            path.to_string(),
            Record { content_snapshot: content, countdown: self.config.n_initial, dirty_flag: dirty, idle_ticks: 0 },
        );
    }

    /// `get(path) -> content | absent`: used by `read` to serve content
    /// before it has been flushed to the DHT.
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.records.lock().await.get(path).map(|record| record.content_snapshot.clone())
    }

    /// `remove(path)`: drops the record; any outstanding pending emission
    /// is cancelled along with it.
    pub async fn remove(&self, path: &str) {
        self.records.lock().await.remove(path);
    }

    /// Decrements every record's countdown by one tick. Records that hit
    /// zero while dirty emit [`CompleteWrite`] and get a fresh countdown;
    /// records that are clean accumulate idle ticks and are dropped once
    /// `n_idle` is reached.
    async fn tick(&self) {
        let due: Vec<CompleteWrite> = {
            let mut records = self.records.lock().await;
            let mut due = Vec::new();
            let mut evict = Vec::new();
            for (path, record) in records.iter_mut() {
                if record.countdown > 0 {
                    record.countdown -= 1;
                    continue;
                }
                if record.dirty_flag {
                    due.push(CompleteWrite { path: path.clone(), content: record.content_snapshot.clone() });
                    record.dirty_flag = false;
                    record.countdown = self.config.n_initial;
                    record.idle_ticks = 0;
                } else {
                    record.idle_ticks += 1;
                    if record.idle_ticks >= self.config.n_idle {
                        evict.push(path.clone());
                    }
                }
            }
            for path in evict {
                records.remove(&path);
            }
            due
        };

        for event in due {
            debug!(path = %event.path, "monitor emitting CompleteWrite");
            self.bus.dispatch(event).await;
        }
    }

    /// Runs the cooperative tick loop on its own task until [`Self::terminate`]
    /// is called. The Monitor tick never blocks on DHT I/O: emission hands
    /// off to the bus and returns immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.tick_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if self.stop.load(Ordering::Acquire) {
                            break;
                        }
                        self.tick().await;
                    }
                    _ = self.stopped.notified() => break,
                }
            }
        })
    }

    /// `terminate()`: sets a stop flag; the loop exits within one tick.
    pub fn terminate(&self) {
        self.stop.store(true, Ordering::Release);
        self.stopped.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> MonitorConfig {
        MonitorConfig { n_initial: 2, tick_interval: Duration::from_millis(5), n_idle: 2 }
    }

    #[tokio::test]
    async fn add_then_tick_emits_after_countdown() {
        struct Recorder(Arc<Mutex<Vec<CompleteWrite>>>);
        #[async_trait::async_trait]
        impl crate::bus::Listener for Recorder {
            async fn handle(&self, event: CompleteWrite) {
                self.0.lock().await.push(event);
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let bus = Arc::new(EventBus::new());
        bus.register(Arc::new(Recorder(seen.clone()))).await;

        let monitor = FileMonitor::new(fast_config(), bus);
        monitor.add("/a.txt", b"hi".to_vec()).await;

        monitor.tick().await;
        monitor.tick().await;
        assert!(seen.lock().await.is_empty());
        monitor.tick().await;

        let events = seen.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, "/a.txt");
        assert_eq!(events[0].content, b"hi");
    }

    #[tokio::test]
    async fn clean_record_is_evicted_after_idle_ticks() {
        let bus = Arc::new(EventBus::new());
        let monitor = FileMonitor::new(fast_config(), bus);
        monitor.add("/a.txt", b"hi".to_vec()).await;

        for _ in 0..10 {
            monitor.tick().await;
        }

        assert!(monitor.get("/a.txt").await.is_none());
    }

    #[tokio::test]
    async fn repeated_add_resets_countdown_and_dirty_flag() {
        let bus = Arc::new(EventBus::new());
        let monitor = FileMonitor::new(fast_config(), bus);
        monitor.add("/a.txt", b"hi".to_vec()).await;
        monitor.tick().await;
        monitor.add("/a.txt", b"hi2".to_vec()).await;

        let snapshot = monitor.get("/a.txt").await.unwrap();
        assert_eq!(snapshot, b"hi2");
    }
}
