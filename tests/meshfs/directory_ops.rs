use meshfs::errno::Errno;

use super::common::Fixture;

/// `rmdir` on a non-empty directory always fails, regardless of how the
/// directory came to have children.
#[tokio::test]
async fn rmdir_fails_on_non_empty_directory() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.mkdir("/d").await.unwrap();
    fixture.peer.adapter.create("/d/f.txt").await.unwrap();

    let error = fixture.peer.adapter.rmdir("/d").await.unwrap_err();
    assert_eq!(error, Errno::ENOTEMPTY);
}

#[tokio::test]
async fn rmdir_empty_directory_then_find_is_enoent() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.mkdir("/empty").await.unwrap();
    fixture.peer.adapter.rmdir("/empty").await.unwrap();

    let error = fixture.peer.adapter.getattr("/empty").await.unwrap_err();
    assert_eq!(error, Errno::ENOENT);
}

#[tokio::test]
async fn mkdir_duplicate_name_fails_eexist() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.mkdir("/d").await.unwrap();

    let error = fixture.peer.adapter.mkdir("/d").await.unwrap_err();
    assert_eq!(error, Errno::EEXIST);
}

#[tokio::test]
async fn readdir_lists_created_children() {
    let fixture = Fixture::new().await;
    fixture.peer.adapter.mkdir("/d").await.unwrap();
    fixture.peer.adapter.create("/d/a.txt").await.unwrap();
    fixture.peer.adapter.create("/d/b.txt").await.unwrap();

    let mut names: Vec<_> = fixture.peer.adapter.readdir("/d").await.unwrap().into_iter().map(|entry| entry.name).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
}
