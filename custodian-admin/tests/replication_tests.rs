/// Integration tests for resource tree replication
///
/// Run with: cargo test -p custodian-admin --test replication_tests

use chrono::Utc;
use custodian_admin::error::AdminError;
use custodian_admin::replicator::Replicator;
use custodian_admin::tree::build_forest;
use custodian_shared::models::resource::{Resource, ResourceKind};
use custodian_shared::storage::{LocalStorage, MemoryStorage, StorageOp};
use std::sync::Arc;

fn resource(id: i32, pid: Option<i32>, full_name: &str, is_directory: bool) -> Resource {
    Resource {
        id,
        pid,
        full_name: full_name.to_string(),
        is_directory,
        kind: ResourceKind::File,
        owner_id: 1,
        size: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn snapshot(storage: &MemoryStorage, prefix: &str) -> Vec<(String, Option<Vec<u8>>)> {
    let mut entries = Vec::new();
    for path in storage.paths().await {
        if path.starts_with(prefix) {
            let content = storage.read_file(&path).await;
            entries.push((path, content));
        }
    }
    entries
}

#[tokio::test]
async fn test_fails_fast_on_missing_source() {
    let storage = Arc::new(MemoryStorage::new());
    storage.put_file("/src/a.txt", b"a").await.unwrap();
    storage.put_file("/src/c.txt", b"c").await.unwrap();
    let replicator = Replicator::new(storage.clone());

    let forest = build_forest(vec![
        resource(1, None, "/a.txt", false),
        resource(2, None, "/b.txt", false),
        resource(3, None, "/c.txt", false),
    ]);

    let err = replicator.replicate(&forest, "/src", "/dst").await.unwrap_err();

    assert!(matches!(err, AdminError::ResourceMissing(ref name) if name == "/b.txt"));
    assert!(storage.contains("/dst/a.txt").await);
    assert!(!storage.contains("/dst/c.txt").await);
    assert!(!storage
        .operations()
        .await
        .iter()
        .any(|op| matches!(op, StorageOp::Exists(p) if p == "/src/c.txt")));
}

#[tokio::test]
async fn test_replication_is_idempotent() {
    let storage = Arc::new(MemoryStorage::new());
    storage.put_file("/src/a.txt", b"a").await.unwrap();
    storage.put_file("/src/sub/b.txt", b"b").await.unwrap();
    storage.put_dir("/src/empty").await.unwrap();
    let replicator = Replicator::new(storage.clone());

    let forest = build_forest(vec![
        resource(1, None, "/a.txt", false),
        resource(2, None, "/sub", true),
        resource(3, Some(2), "/sub/b.txt", false),
        resource(4, None, "/empty", true),
    ]);

    let first = replicator.replicate(&forest, "/src", "/dst").await.unwrap();
    let after_first = snapshot(&storage, "/dst").await;

    let second = replicator.replicate(&forest, "/src", "/dst").await.unwrap();
    let after_second = snapshot(&storage, "/dst").await;

    assert_eq!(first.files_copied, 2);
    assert_eq!(second.files_copied, 2);
    assert_eq!(after_first, after_second);
    assert_eq!(storage.read_file("/dst/sub/b.txt").await, Some(b"b".to_vec()));
    assert!(storage.is_directory("/dst/empty").await);
}

#[tokio::test]
async fn test_depth_first_order() {
    let storage = Arc::new(MemoryStorage::new());
    storage.put_file("/src/d/x.txt", b"x").await.unwrap();
    storage.put_file("/src/y.txt", b"y").await.unwrap();
    let replicator = Replicator::new(storage.clone());

    let forest = build_forest(vec![
        resource(1, None, "/d", true),
        resource(2, Some(1), "/d/x.txt", false),
        resource(3, None, "/y.txt", false),
    ]);

    replicator.replicate(&forest, "/src", "/dst").await.unwrap();

    let copies: Vec<String> = storage
        .operations()
        .await
        .into_iter()
        .filter_map(|op| match op {
            StorageOp::Copy { dst, .. } => Some(dst),
            _ => None,
        })
        .collect();
    assert_eq!(copies, vec!["/dst/d/x.txt", "/dst/y.txt"]);
}

#[tokio::test]
async fn test_replicates_on_local_filesystem() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("t1/resources/sub")).unwrap();
    std::fs::write(dir.path().join("t1/resources/a.txt"), b"a").unwrap();
    std::fs::write(dir.path().join("t1/resources/sub/b.txt"), b"b").unwrap();
    let replicator = Replicator::new(Arc::new(LocalStorage::new(dir.path())));

    let forest = build_forest(vec![
        resource(1, None, "/a.txt", false),
        resource(2, None, "/sub", true),
        resource(3, Some(2), "/sub/b.txt", false),
    ]);

    replicator
        .replicate(&forest, "/t1/resources", "/t2/resources")
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.path().join("t2/resources/a.txt")).unwrap(), b"a");
    assert_eq!(std::fs::read(dir.path().join("t2/resources/sub/b.txt")).unwrap(), b"b");
}
