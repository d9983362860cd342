/// Integration tests for tenant switch migration
///
/// Run with: cargo test -p custodian-admin --test migration_tests

mod common;

use common::{path, Fixture};
use custodian_admin::accounts::AccountUpdate;
use custodian_admin::error::{AdminError, TargetRef};
use custodian_shared::models::account::{Account, AccountType};
use custodian_shared::models::resource::ResourceKind;
use custodian_shared::models::tenant::Tenant;

struct Scenario {
    fx: Fixture,
    t1: Tenant,
    t2: Tenant,
    user: Account,
}

/// Account in t1 owning `/a.txt` and `/sub/b.txt`, with t2 not provisioned
async fn scenario() -> Scenario {
    let fx = Fixture::new(true);
    let t1 = fx.store.add_tenant("t1");
    let t2 = fx.store.add_tenant("t2");
    let user = fx.store.add_account("jdoe", Some(t1.id), AccountType::General);

    fx.store.add_resource(1, None, "/a.txt", false, ResourceKind::File, user.id);
    fx.store.add_resource(2, None, "/sub", true, ResourceKind::File, user.id);
    fx.store.add_resource(3, Some(2), "/sub/b.txt", false, ResourceKind::File, user.id);

    fx.storage.put_file(&path("t1/resources/a.txt"), b"a").await.unwrap();
    fx.storage.put_file(&path("t1/resources/sub/b.txt"), b"b").await.unwrap();
    fx.storage.put_dir(&path("t1/udfs")).await.unwrap();
    fx.storage
        .put_file(&path(&format!("t1/home/{}/notes", user.id)), b"n")
        .await
        .unwrap();

    Scenario { fx, t1, t2, user }
}

fn move_to(tenant_id: i32) -> AccountUpdate {
    AccountUpdate {
        tenant_id: Some(tenant_id),
        ..AccountUpdate::default()
    }
}

#[tokio::test]
async fn test_tenant_switch_moves_files() {
    let s = scenario().await;

    let account = s
        .fx
        .service
        .update_account(&s.fx.admin, s.user.id, move_to(s.t2.id))
        .await
        .unwrap();

    assert_eq!(account.tenant_id, Some(s.t2.id));
    assert_eq!(s.fx.store.account(s.user.id).unwrap().tenant_id, Some(s.t2.id));

    let storage = &s.fx.storage;
    assert_eq!(storage.read_file(&path("t2/resources/a.txt")).await, Some(b"a".to_vec()));
    assert_eq!(storage.read_file(&path("t2/resources/sub/b.txt")).await, Some(b"b".to_vec()));
    assert!(!storage.contains(&path(&format!("t1/home/{}", s.user.id))).await);
    assert!(storage.is_directory(&path(&format!("t2/home/{}", s.user.id))).await);
    assert!(storage.is_directory(&path("t2/udfs")).await);

    // sources stay in place
    assert!(storage.contains(&path("t1/resources/a.txt")).await);
}

#[tokio::test]
async fn test_udf_category_replicated_separately() {
    let s = scenario().await;
    s.fx.store.add_resource(10, None, "/lib/f.jar", false, ResourceKind::Udf, s.user.id);
    s.fx.storage.put_file(&path("t1/udfs/lib/f.jar"), b"jar").await.unwrap();

    s.fx.service
        .update_account(&s.fx.admin, s.user.id, move_to(s.t2.id))
        .await
        .unwrap();

    assert_eq!(
        s.fx.storage.read_file(&path("t2/udfs/lib/f.jar")).await,
        Some(b"jar".to_vec())
    );
    assert!(!s.fx.storage.contains(&path("t2/resources/lib/f.jar")).await);
}

#[tokio::test]
async fn test_missing_new_tenant_changes_nothing() {
    let s = scenario().await;
    s.fx.storage.clear_operations().await;

    let err = s
        .fx
        .service
        .update_account(&s.fx.admin, s.user.id, move_to(99))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::TargetNotFound(TargetRef::Tenant(99))));
    assert_eq!(s.fx.store.account(s.user.id).unwrap().tenant_id, Some(s.t1.id));
    assert!(s.fx.storage.operations().await.is_empty());
}

#[tokio::test]
async fn test_missing_source_keeps_tenant() {
    let s = scenario().await;
    s.fx.store.add_resource(4, None, "/gone.txt", false, ResourceKind::File, s.user.id);

    let err = s
        .fx
        .service
        .update_account(&s.fx.admin, s.user.id, move_to(s.t2.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::ResourceMissing(ref name) if name == "/gone.txt"));
    assert_eq!(s.fx.store.account(s.user.id).unwrap().tenant_id, Some(s.t1.id));
    assert!(s
        .fx
        .storage
        .contains(&path(&format!("t1/home/{}/notes", s.user.id)))
        .await);
}

#[tokio::test]
async fn test_failed_save_reprovisions_old_home() {
    let s = scenario().await;
    s.fx.store.fail_account_saves(true);

    let err = s
        .fx
        .service
        .update_account(&s.fx.admin, s.user.id, move_to(s.t2.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::Store(_)));
    assert_eq!(s.fx.store.account(s.user.id).unwrap().tenant_id, Some(s.t1.id));
    assert!(s
        .fx
        .storage
        .is_directory(&path(&format!("t1/home/{}", s.user.id)))
        .await);
    assert!(!s
        .fx
        .storage
        .contains(&path(&format!("t2/home/{}", s.user.id)))
        .await);
}

#[tokio::test]
async fn test_storage_outage_keeps_tenant() {
    let s = scenario().await;
    s.fx.storage.set_unavailable(&path("t2")).await;

    let err = s
        .fx
        .service
        .update_account(&s.fx.admin, s.user.id, move_to(s.t2.id))
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::StorageUnavailable(_)));
    assert_eq!(s.fx.store.account(s.user.id).unwrap().tenant_id, Some(s.t1.id));
}

#[tokio::test]
async fn test_same_tenant_skips_migration() {
    let s = scenario().await;
    s.fx.storage.clear_operations().await;

    let account = s
        .fx
        .service
        .update_account(
            &s.fx.admin,
            s.user.id,
            AccountUpdate {
                tenant_id: Some(s.t1.id),
                queue: Some("etl".to_string()),
                ..AccountUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(account.queue, "etl");
    assert!(s.fx.storage.operations().await.is_empty());
}
