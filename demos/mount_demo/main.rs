//! Demo binary exercising a single in-process peer against an
//! [`InMemoryDht`] — a stand-in for the real Kademlia overlay, which this
//! crate does not implement.
//!
//! Run with `cargo run --example meshfs-demo -- /tmp/meshfs-demo`.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use meshfs::config::Config;
use meshfs::dht::InMemoryDht;
use meshfs::peer::Peer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mount_point = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&mount_point).expect("create mount point");

    let config = Config {
        mount_point: mount_point.clone(),
        port: 4045,
        start_cli: false,
        block_size: 4000,
        initial_blocks: 1024,
        monitor_initial_countdown: 3,
        monitor_tick_interval_ms: 200,
        monitor_idle_eviction: 5,
        rendezvous_url: None,
    };

    let dht = InMemoryDht::new(Ipv4Addr::LOCALHOST.into());
    let peer = Peer::mount(config, dht, true).await.expect("mount peer");

    peer.adapter.create("/hello.txt").await.expect("create");
    peer.adapter.write("/hello.txt", 0, b"hello, meshfs").await.expect("write");

    tokio::time::sleep(std::time::Duration::from_millis(900)).await;

    let attr = peer.adapter.getattr("/hello.txt").await.expect("getattr");
    println!("mounted at {}", mount_point.display());
    println!("/hello.txt size={}", attr.size);

    let bytes = peer.adapter.read("/hello.txt", 0, attr.size as usize).await.expect("read");
    println!("contents: {}", String::from_utf8_lossy(&bytes));

    peer.unmount().await;
}
