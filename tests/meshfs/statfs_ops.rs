use std::net::Ipv4Addr;

use meshfs::dht::{InMemoryDht, PeerId};

use super::common::Fixture;

/// Reported capacity grows when a peer joins the overlay and never drops
/// below the space already in use when a peer leaves.
#[tokio::test]
async fn statfs_capacity_grows_on_peer_join_and_shrinks_on_leave_without_dropping_below_used() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.create("/big.txt").await.unwrap();
    fixture.peer.adapter.write("/big.txt", 0, &vec![0u8; 8000]).await.unwrap();
    fixture.flush().await;

    let before = fixture.peer.adapter.statfs().await;
    let used_blocks = before.blocks - before.bfree;

    fixture.dht.simulate_peer_join(PeerId("peer-b".to_string())).await;
    let after_join = fixture.peer.adapter.statfs().await;
    assert!(after_join.blocks > before.blocks);

    fixture.dht.simulate_peer_leave(PeerId("peer-b".to_string())).await;
    let after_leave = fixture.peer.adapter.statfs().await;
    assert!(after_leave.blocks >= used_blocks);
}

#[tokio::test]
async fn statfs_reports_configured_block_size() {
    let fixture = Fixture::new().await;
    let info = fixture.peer.adapter.statfs().await;
    assert_eq!(info.bsize, 4000);
}

#[tokio::test]
async fn peer_count_tracks_joins_and_leaves_independent_of_fixture() {
    let dht = InMemoryDht::new(Ipv4Addr::LOCALHOST.into());
    assert_eq!(dht.peer_count().await, 0);
    dht.simulate_peer_join(PeerId("a".to_string())).await;
    dht.simulate_peer_join(PeerId("b".to_string())).await;
    assert_eq!(dht.peer_count().await, 2);
    dht.simulate_peer_leave(PeerId("a".to_string())).await;
    assert_eq!(dht.peer_count().await, 1);
}
