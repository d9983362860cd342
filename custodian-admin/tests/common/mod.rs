#![allow(dead_code)]

/// Shared fixtures for the account administration integration tests

use custodian_admin::accounts::AccountService;
use custodian_admin::config::ServiceSettings;
use custodian_admin::store::MemoryAccountStore;
use custodian_shared::models::account::{Account, AccountType};
use custodian_shared::storage::{MemoryStorage, StorageLayout};
use std::sync::Arc;

pub const BASE: &str = "/custodian";

/// In-memory store and storage wired into an [`AccountService`]
pub struct Fixture {
    pub store: Arc<MemoryAccountStore>,
    pub storage: Arc<MemoryStorage>,
    pub service: AccountService,
    pub admin: Account,
}

impl Fixture {
    pub fn new(resource_upload_enabled: bool) -> Self {
        let store = Arc::new(MemoryAccountStore::new());
        let storage = Arc::new(MemoryStorage::new());
        let admin = store.add_account("admin", None, AccountType::Administrator);

        let service = AccountService::new(
            store.clone(),
            storage.clone(),
            StorageLayout::new(BASE),
            ServiceSettings {
                resource_upload_enabled,
                default_tenant_id: 1,
            },
        );

        Fixture {
            store,
            storage,
            service,
            admin,
        }
    }
}

pub fn path(tail: &str) -> String {
    format!("{}/{}", BASE, tail.trim_start_matches('/'))
}
