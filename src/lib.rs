//! meshfs — a POSIX filesystem mirror backed by a Kademlia-style
//! distributed hash table.
//!
//! Three subsystems carry the design: the in-memory [`mirror`] answering
//! kernel filesystem callbacks synchronously, the write-coalescing
//! [`monitor`] that turns bursty writes into whole-file commits, and the
//! [`dht`]/[`version`] persistence layer that stores content under
//! content-addressed keys and synchronizes remote changes back in. The
//! kernel FUSE binding, the bootstrap rendezvous *service*, and the raw
//! Kademlia transport are external collaborators this crate defines trait
//! boundaries and test doubles for, not implementations of.

pub mod adapter;
pub mod bootstrap;
pub mod bus;
pub mod config;
pub mod dht;
pub mod errno;
pub mod mirror;
pub mod monitor;
pub mod peer;
pub mod repl;
pub mod stat;
pub mod syncer;
pub mod version;
pub mod writer;
