use meshfs::dht::DhtClient;

use super::common::Fixture;

/// A file written on one peer becomes readable from a second peer
/// mounted against the same DHT, once the first peer's write has flushed
/// and the second peer's syncer has had a chance to run.
#[tokio::test]
async fn second_peer_converges_on_first_peers_write() {
    let first = Fixture::new().await;
    first.peer.adapter.create("/shared.txt").await.unwrap();
    first.peer.adapter.write("/shared.txt", 0, b"converged").await.unwrap();
    first.flush().await;

    let second = Fixture::join(first.dht.clone()).await;
    second.sync_cycle().await;

    let attr = second.peer.adapter.getattr("/shared.txt").await.unwrap();
    assert_eq!(attr.size, 9);

    let bytes = second.peer.adapter.read("/shared.txt", 0, 9).await.unwrap();
    assert_eq!(bytes, b"converged");
}

/// A directory created on one peer is visible on another after a sync
/// cycle, even though directories carry no DHT content of their own.
#[tokio::test]
async fn second_peer_sees_directory_created_on_first_peer() {
    let first = Fixture::new().await;
    first.peer.adapter.mkdir("/shared-dir").await.unwrap();
    first.peer.adapter.create("/shared-dir/file.txt").await.unwrap();
    first.peer.adapter.write("/shared-dir/file.txt", 0, b"hi").await.unwrap();
    first.flush().await;

    let second = Fixture::join(first.dht.clone()).await;
    second.sync_cycle().await;

    let entries = second.peer.adapter.readdir("/shared-dir").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "file.txt");
}

/// Unlinking a replicated file on one peer clears its DHT entries, but a
/// peer that already materialized the path locally is only caught up by
/// its own next sync cycle re-reading `K_keys` — deletion propagation
/// isn't part of the path-index contract, so the second peer's copy
/// persists until it independently decides to drop it.
#[tokio::test]
async fn unlink_on_first_peer_clears_shared_dht_entry() {
    let first = Fixture::new().await;
    first.peer.adapter.create("/transient.txt").await.unwrap();
    first.peer.adapter.write("/transient.txt", 0, b"bye").await.unwrap();
    first.flush().await;

    first.peer.adapter.unlink("/transient.txt").await.unwrap();

    let key = meshfs::dht::Key::for_path("/transient.txt");
    assert_eq!(first.dht.get(key).await.unwrap(), None);
    let indexed = first.dht.get_all_under(meshfs::dht::keys_location()).await.unwrap();
    assert!(!indexed.contains_key(&key));
}
