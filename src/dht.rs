//! Defines the boundary between `meshfs` and the distributed hash table
//! overlay ([`DhtClient`]) plus an in-process test double ([`InMemoryDht`])
//! standing in for the real Kademlia transport.
//!
//! The real transport (peer discovery, wire format, bucket maintenance) is
//! a separate concern; only the put/get/versioned/enumerate contract a
//! caller needs lives here.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Fixed seed so every peer derives the same [`Key`] for the same input,
/// independent of process, without pulling in a dedicated hashing crate.
const KEY_SEED: u64 = 0x6d65_7368_6673_2021;

/// A content-addressed or location key in the DHT's flat key space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub u64);

impl Key {
    /// The content-addressed key a path's data and path-index entry are
    /// filed under.
    pub fn for_path(path: &str) -> Key {
        Key(stable_hash(path))
    }

    /// A named, well-known bucket such as `K_keys = hash("keys")`.
    pub fn location(name: &str) -> Key {
        Key(stable_hash(name))
    }
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    KEY_SEED.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

/// Version identifier inside a path's version chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(pub u64);

/// Identifies one peer in the overlay's peer map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(pub String);

/// A peer-map delta, delivered to listeners registered via
/// [`DhtClient::peer_map_change_listener`].
#[derive(Debug, Clone, Default)]
pub struct PeerMapEvent {
    pub added: Vec<PeerId>,
    pub removed: Vec<PeerId>,
}

/// Transient DHT failures: logged by the caller, never propagated to the
/// kernel-visible error path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DhtError {
    Unreachable,
    Timeout,
    Serialization,
}

impl std::fmt::Display for DhtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DhtError::Unreachable => write!(f, "no reachable peer"),
            DhtError::Timeout => write!(f, "request timed out"),
            DhtError::Serialization => write!(f, "response failed to parse"),
        }
    }
}

impl std::error::Error for DhtError {}

pub type DhtResult<T> = std::result::Result<T, DhtError>;

/// Callback invoked with a [`PeerMapEvent`] whenever the overlay's peer set
/// changes. Consumed by C8 (FS Stat / Resize).
pub type PeerMapListener = Box<dyn Fn(PeerMapEvent) + Send + Sync>;

/// Key/value and versioned key/value operations, plus peer-map change
/// notifications.
#[async_trait]
pub trait DhtClient: Send + Sync {
    async fn put(&self, key: Key, data: Vec<u8>) -> DhtResult<()>;
    async fn get(&self, key: Key) -> DhtResult<Option<Vec<u8>>>;
    async fn remove(&self, key: Key) -> DhtResult<()>;

    async fn put_versioned(&self, key: Key, version: VersionId, data: Vec<u8>) -> DhtResult<()>;
    async fn get_versioned(&self, key: Key, version: VersionId) -> DhtResult<Option<Vec<u8>>>;
    async fn remove_versioned(&self, key: Key, version: VersionId) -> DhtResult<()>;

    /// Enumerates everything stored under a location key, e.g. `K_keys`.
    async fn get_all_under(&self, location: Key) -> DhtResult<HashMap<Key, Vec<u8>>>;

    /// Files `data` under `location` keyed by `content_key` — used to file
    /// the `K_keys` bucket entry for a path, keyed by that path's content
    /// key.
    async fn put_under(&self, location: Key, content_key: Key, data: Vec<u8>) -> DhtResult<()>;

    /// Removes the `location`/`content_key` entry installed by
    /// [`Self::put_under`].
    async fn remove_under(&self, location: Key, content_key: Key) -> DhtResult<()>;

    /// Registers a callback fired on every peer-map change. Implementations
    /// may call it synchronously from whatever thread observes the change.
    fn peer_map_change_listener(&self, callback: PeerMapListener);

    fn local_ip(&self) -> IpAddr;

    async fn shutdown(&self);
}

#[derive(Default)]
struct Store {
    values: HashMap<Key, Vec<u8>>,
    versioned: HashMap<(Key, VersionId), Vec<u8>>,
    under: HashMap<Key, HashMap<Key, Vec<u8>>>,
}

/// In-process [`DhtClient`] used by the demo binary and the integration
/// tests. Two [`Peer`](crate::peer::Peer)s sharing one `Arc<InMemoryDht>`
/// is the in-process analogue of two real peers converged over the
/// overlay.
pub struct InMemoryDht {
    store: RwLock<Store>,
    listeners: Mutex<Vec<PeerMapListener>>,
    peers: RwLock<Vec<PeerId>>,
    local_ip: IpAddr,
}

impl InMemoryDht {
    pub fn new(local_ip: IpAddr) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(Store::default()),
            listeners: Mutex::new(Vec::new()),
            peers: RwLock::new(Vec::new()),
            local_ip,
        })
    }

    /// Test/demo helper: simulate a peer joining the overlay and fire the
    /// registered listeners synchronously, matching the Event Bus's own
    /// synchronous dispatch discipline.
    pub async fn simulate_peer_join(&self, peer: PeerId) {
        self.peers.write().await.push(peer.clone());
        let event = PeerMapEvent { added: vec![peer], removed: Vec::new() };
        for listener in self.listeners.lock().unwrap().iter() {
            listener(event.clone());
        }
    }

    pub async fn simulate_peer_leave(&self, peer: PeerId) {
        self.peers.write().await.retain(|candidate| candidate != &peer);
        let event = PeerMapEvent { added: Vec::new(), removed: vec![peer] };
        for listener in self.listeners.lock().unwrap().iter() {
            listener(event.clone());
        }
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[async_trait]
impl DhtClient for InMemoryDht {
    async fn put(&self, key: Key, data: Vec<u8>) -> DhtResult<()> {
        self.store.write().await.values.insert(key, data);
        Ok(())
    }

    async fn get(&self, key: Key) -> DhtResult<Option<Vec<u8>>> {
        Ok(self.store.read().await.values.get(&key).cloned())
    }

    async fn remove(&self, key: Key) -> DhtResult<()> {
        self.store.write().await.values.remove(&key);
        Ok(())
    }

    async fn put_versioned(&self, key: Key, version: VersionId, data: Vec<u8>) -> DhtResult<()> {
        self.store.write().await.versioned.insert((key, version), data);
        Ok(())
    }

    async fn get_versioned(&self, key: Key, version: VersionId) -> DhtResult<Option<Vec<u8>>> {
        Ok(self.store.read().await.versioned.get(&(key, version)).cloned())
    }

    async fn remove_versioned(&self, key: Key, version: VersionId) -> DhtResult<()> {
        self.store.write().await.versioned.remove(&(key, version));
        Ok(())
    }

    async fn get_all_under(&self, location: Key) -> DhtResult<HashMap<Key, Vec<u8>>> {
        Ok(self.store.read().await.under.get(&location).cloned().unwrap_or_default())
    }

    async fn put_under(&self, location: Key, content_key: Key, data: Vec<u8>) -> DhtResult<()> {
        self.store.write().await.under.entry(location).or_default().insert(content_key, data);
        Ok(())
    }

    async fn remove_under(&self, location: Key, content_key: Key) -> DhtResult<()> {
        if let Some(bucket) = self.store.write().await.under.get_mut(&location) {
            bucket.remove(&content_key);
        }
        Ok(())
    }

    fn peer_map_change_listener(&self, callback: PeerMapListener) {
        self.listeners.lock().unwrap().push(callback);
    }

    fn local_ip(&self) -> IpAddr {
        self.local_ip
    }

    async fn shutdown(&self) {
        self.store.write().await.values.clear();
    }
}

/// The well-known location every path is indexed under. Enumerable by any
/// peer via [`DhtClient::get_all_under`] to discover every path currently
/// stored.
pub fn keys_location() -> Key {
    Key::location("keys")
}
