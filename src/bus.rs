//! Event Bus (C5): dispatches monitor-emitted events to registered
//! listeners.
//!
//! A minimal typed publish-subscribe. Listeners register under no name —
//! every registered [`Listener`] receives every [`CompleteWrite`] — which
//! is all the Writer and Syncer listeners need, since both want every
//! completed write.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Emitted by the File Monitor (C4) once a quiescent burst of writes for
/// one path is ready to be flushed.
#[derive(Debug, Clone)]
pub struct CompleteWrite {
    pub path: String,
    pub content: Vec<u8>,
}

/// A Event Bus subscriber. `handle` is invoked synchronously from the
/// Monitor's tick task — implementations that need to block on DHT I/O
/// must hand off to their own `tokio::spawn`ed task before returning, so
/// the tick itself is never held up.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn handle(&self, event: CompleteWrite);
}

#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, listener: Arc<dyn Listener>) {
        self.listeners.write().await.push(listener);
    }

    /// Dispatches `event` to every registered listener, in registration
    /// order. Ordering across *paths* is not guaranteed, only per-path
    /// emission order — this method makes no promise about interleaving
    /// emissions for different paths either, since the Monitor's tick
    /// already serializes one emission at a time.
    pub async fn dispatch(&self, event: CompleteWrite) {
        for listener in self.listeners.read().await.iter() {
            listener.handle(event.clone()).await;
        }
    }
}
