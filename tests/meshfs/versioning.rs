use meshfs::dht::DhtClient;

use super::common::Fixture;

/// Overwriting a file repeatedly grows its version chain by one entry
/// per overwrite, and the historical content is recoverable from the DHT.
#[tokio::test]
async fn repeated_overwrites_grow_version_chain() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/doc.txt").await.unwrap();

    fixture.peer.adapter.write("/doc.txt", 0, b"v1").await.unwrap();
    fixture.flush().await;
    fixture.peer.adapter.write("/doc.txt", 0, b"v2xxx").await.unwrap();
    fixture.flush().await;
    fixture.peer.adapter.write("/doc.txt", 0, b"v3xxxxx").await.unwrap();
    fixture.flush().await;

    let bytes = fixture.peer.adapter.read("/doc.txt", 0, 7).await.unwrap();
    assert_eq!(bytes, b"v3xxxxx");

    let key = meshfs::dht::Key::for_path("/doc.txt");
    let first = fixture.dht.get_versioned(key, meshfs::dht::VersionId(0)).await.unwrap();
    assert_eq!(first, Some(b"v1".to_vec()));
}

/// A path's version chain is cleared, not merely stopped, when the path
/// itself is removed.
#[tokio::test]
async fn unlink_clears_version_chain() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/doc.txt").await.unwrap();
    fixture.peer.adapter.write("/doc.txt", 0, b"v1").await.unwrap();
    fixture.flush().await;
    fixture.peer.adapter.write("/doc.txt", 0, b"v2").await.unwrap();
    fixture.flush().await;

    fixture.peer.adapter.unlink("/doc.txt").await.unwrap();

    let key = meshfs::dht::Key::for_path("/doc.txt");
    assert_eq!(fixture.dht.get_versioned(key, meshfs::dht::VersionId(0)).await.unwrap(), None);
}

/// The first write to a file never archives anything, since there is no
/// prior non-empty blob yet.
#[tokio::test]
async fn first_write_never_archives() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/fresh.txt").await.unwrap();
    fixture.peer.adapter.write("/fresh.txt", 0, b"only version").await.unwrap();
    fixture.flush().await;

    let key = meshfs::dht::Key::for_path("/fresh.txt");
    assert_eq!(fixture.dht.get_versioned(key, meshfs::dht::VersionId(0)).await.unwrap(), None);
}
