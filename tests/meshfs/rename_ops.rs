use meshfs::dht::DhtClient;
use meshfs::errno::Errno;

use super::common::Fixture;

/// Rename moves content and the old path stops resolving.
#[tokio::test]
async fn rename_moves_file_and_retains_content() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/old.txt").await.unwrap();
    fixture.peer.adapter.write("/old.txt", 0, b"payload").await.unwrap();

    fixture.peer.adapter.rename("/old.txt", "/new.txt").await.unwrap();

    let error = fixture.peer.adapter.getattr("/old.txt").await.unwrap_err();
    assert_eq!(error, Errno::ENOENT);

    let bytes = fixture.peer.adapter.read("/new.txt", 0, 7).await.unwrap();
    assert_eq!(bytes, b"payload");
}

/// Rename clears the old path's DHT entry once the Writer Listener has
/// had a chance to flush the new path.
#[tokio::test]
async fn rename_then_flush_republishes_under_new_path_only() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/old.txt").await.unwrap();
    fixture.peer.adapter.write("/old.txt", 0, b"payload").await.unwrap();
    fixture.flush().await;

    fixture.peer.adapter.rename("/old.txt", "/new.txt").await.unwrap();
    fixture.flush().await;

    let old_key = meshfs::dht::Key::for_path("/old.txt");
    let new_key = meshfs::dht::Key::for_path("/new.txt");
    assert_eq!(fixture.dht.get(old_key).await.unwrap(), None);
    assert_eq!(fixture.dht.get(new_key).await.unwrap(), Some(b"payload".to_vec()));
}

#[tokio::test]
async fn rename_onto_existing_name_fails_eexist() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/a.txt").await.unwrap();
    fixture.peer.adapter.create("/b.txt").await.unwrap();

    let error = fixture.peer.adapter.rename("/a.txt", "/b.txt").await.unwrap_err();
    assert_eq!(error, Errno::EEXIST);
}
