use meshfs::errno::Errno;

use super::common::Fixture;

/// Single-peer write-read round trip.
#[tokio::test]
async fn single_peer_write_then_read_returns_last_written_bytes() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/hello.txt").await.unwrap();
    let written = fixture.peer.adapter.write("/hello.txt", 0, b"hi").await.unwrap();
    assert_eq!(written, 2);

    fixture.flush().await;

    let bytes = fixture.peer.adapter.read("/hello.txt", 0, 2).await.unwrap();
    assert_eq!(bytes, vec![0x68, 0x69]);
}

/// Read after an overwrite returns the last-written bytes, not the first.
#[tokio::test]
async fn read_after_overwrite_returns_latest_bytes() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/a.txt").await.unwrap();
    fixture.peer.adapter.write("/a.txt", 0, b"first").await.unwrap();
    fixture.peer.adapter.write("/a.txt", 0, b"second").await.unwrap();

    let bytes = fixture.peer.adapter.read("/a.txt", 0, 6).await.unwrap();
    assert_eq!(bytes, b"second");
}

/// Unlink followed by getattr returns ENOENT.
#[tokio::test]
async fn unlink_then_getattr_is_enoent() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/a.txt").await.unwrap();
    fixture.peer.adapter.unlink("/a.txt").await.unwrap();

    let error = fixture.peer.adapter.getattr("/a.txt").await.unwrap_err();
    assert_eq!(error, Errno::ENOENT);
}

#[tokio::test]
async fn write_past_end_of_file_zero_fills_gap() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/sparse.txt").await.unwrap();
    fixture.peer.adapter.write("/sparse.txt", 4, b"end").await.unwrap();

    let bytes = fixture.peer.adapter.read("/sparse.txt", 0, 7).await.unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 0, b'e', b'n', b'd']);
}

