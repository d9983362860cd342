/// Integration tests for grant reconciliation
///
/// Run with: cargo test -p custodian-admin --test reconcile_tests

mod common;

use common::Fixture;
use custodian_admin::error::{AdminError, TargetRef};
use custodian_shared::models::account::AccountType;
use custodian_shared::models::grant::{GrantKind, NewGrant, Permission};
use custodian_shared::models::resource::ResourceKind;

fn writable(target_id: i32) -> NewGrant {
    NewGrant {
        target_id,
        permission: Permission::Writable,
    }
}

fn readable(target_id: i32) -> NewGrant {
    NewGrant {
        target_id,
        permission: Permission::Readable,
    }
}

#[tokio::test]
async fn test_duplicate_ids_granted_once() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    fx.store.add_resource(5, None, "/a.txt", false, ResourceKind::File, fx.admin.id);
    fx.store.add_resource(7, None, "/b.txt", false, ResourceKind::File, fx.admin.id);

    let outcome = fx
        .service
        .grant_resources(&fx.admin, user.id, "5,5,7")
        .await
        .unwrap();

    assert_eq!(outcome.granted, vec![writable(5), writable(7)]);
    assert_eq!(
        fx.store.grants(user.id, GrantKind::Resource),
        vec![writable(5), writable(7)]
    );
}

#[tokio::test]
async fn test_directories_readable_files_writable() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    fx.store.add_resource(1, None, "/dir", true, ResourceKind::File, fx.admin.id);
    fx.store.add_resource(4, Some(1), "/dir/sub", true, ResourceKind::File, fx.admin.id);
    fx.store.add_resource(9, Some(4), "/dir/sub/x.jar", false, ResourceKind::File, fx.admin.id);

    fx.service
        .grant_resources(&fx.admin, user.id, "1-4-9")
        .await
        .unwrap();

    assert_eq!(
        fx.store.grants(user.id, GrantKind::Resource),
        vec![readable(1), readable(4), writable(9)]
    );
}

#[tokio::test]
async fn test_blocked_revocation_changes_nothing() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    fx.store.add_resource(1, None, "/used.sql", false, ResourceKind::File, user.id);
    fx.store.add_resource(2, None, "/free.sql", false, ResourceKind::File, user.id);
    fx.store.add_resource(3, None, "/new.sql", false, ResourceKind::File, user.id);
    fx.store.seed_grants(user.id, GrantKind::Resource, &[writable(1), writable(2)]);
    fx.store.add_usage(user.id, 1, 9001);

    let err = fx
        .service
        .grant_resources(&fx.admin, user.id, "3")
        .await
        .unwrap_err();

    match err {
        AdminError::TargetInUse { ids, definitions } => {
            assert_eq!(ids, vec![1]);
            assert!(definitions[&1].contains(&9001));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.store.grant_writes(), 0);
    assert_eq!(
        fx.store.grants(user.id, GrantKind::Resource),
        vec![writable(1), writable(2)]
    );
}

#[tokio::test]
async fn test_empty_request_revokes_everything_unless_used() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    fx.store.add_resource(1, None, "/a.sql", false, ResourceKind::File, user.id);
    fx.store.seed_grants(user.id, GrantKind::Resource, &[writable(1)]);
    fx.store.add_usage(user.id, 1, 77);

    let blocked = fx.service.grant_resources(&fx.admin, user.id, "").await;
    assert!(matches!(blocked, Err(AdminError::TargetInUse { .. })));

    let other = fx.store.add_account("other", None, AccountType::General);
    fx.store.seed_grants(other.id, GrantKind::Resource, &[writable(1)]);

    let outcome = fx.service.grant_resources(&fx.admin, other.id, "").await.unwrap();
    assert_eq!(outcome.revoked, vec![1]);
    assert!(fx.store.grants(other.id, GrantKind::Resource).is_empty());
}

#[tokio::test]
async fn test_unknown_target_rejected_before_write() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    fx.store.add_target(GrantKind::DataSource, 10);
    fx.store.seed_grants(user.id, GrantKind::DataSource, &[writable(10)]);

    let err = fx
        .service
        .grant_data_sources(&fx.admin, user.id, "10,11")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdminError::TargetNotFound(TargetRef::Target {
            kind: GrantKind::DataSource,
            id: 11
        })
    ));
    assert_eq!(fx.store.grant_writes(), 0);
    assert_eq!(fx.store.grants(user.id, GrantKind::DataSource), vec![writable(10)]);
}

#[tokio::test]
async fn test_usage_gate_only_applies_to_resources() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    fx.store.add_target(GrantKind::UdfFunction, 1);
    fx.store.seed_grants(user.id, GrantKind::UdfFunction, &[writable(1)]);
    fx.store.add_usage(user.id, 1, 500);

    let outcome = fx
        .service
        .grant_udf_functions(&fx.admin, user.id, "")
        .await
        .unwrap();

    assert_eq!(outcome.revoked, vec![1]);
}

#[tokio::test]
async fn test_grant_requires_administrator() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);

    let result = fx.service.grant_projects(&user, user.id, "1").await;
    assert!(matches!(result, Err(AdminError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_grant_to_unknown_account() {
    let fx = Fixture::new(false);

    let result = fx.service.grant_resources(&fx.admin, 404, "1").await;
    assert!(matches!(
        result,
        Err(AdminError::TargetNotFound(TargetRef::Account(404)))
    ));
}

#[tokio::test]
async fn test_malformed_ids_rejected() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);

    let result = fx.service.grant_resources(&fx.admin, user.id, "1,a").await;
    assert!(matches!(result, Err(AdminError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_chains_rejected_for_flat_kinds() {
    let fx = Fixture::new(false);
    let user = fx.store.add_account("jdoe", None, AccountType::General);
    for kind in [GrantKind::UdfFunction, GrantKind::DataSource] {
        fx.store.add_target(kind, 3);
        fx.store.add_target(kind, 4);
    }
    fx.store.add_project(3, 3003, "etl", fx.admin.id);
    fx.store.add_project(4, 4004, "reports", fx.admin.id);

    let udfs = fx.service.grant_udf_functions(&fx.admin, user.id, "3-4").await;
    let sources = fx.service.grant_data_sources(&fx.admin, user.id, "3-4").await;
    let projects = fx.service.grant_projects(&fx.admin, user.id, "3-4").await;

    assert!(matches!(udfs, Err(AdminError::InvalidArgument(_))));
    assert!(matches!(sources, Err(AdminError::InvalidArgument(_))));
    assert!(matches!(projects, Err(AdminError::InvalidArgument(_))));
    assert_eq!(fx.store.grant_writes(), 0);

    let outcome = fx
        .service
        .grant_projects(&fx.admin, user.id, "3,4")
        .await
        .unwrap();
    assert_eq!(outcome.granted, vec![writable(3), writable(4)]);
}
