/// Tenant namespace provisioning
///
/// Every tenant owns a directory under the storage base path holding its
/// file and UDF categories plus one home directory per account. All
/// operations here are idempotent and never remove anything they did not
/// create for the account in question.

use crate::error::AdminResult;
use custodian_shared::storage::{Storage, StorageLayout};
use std::sync::Arc;

/// Creates and removes tenant namespaces and account homes
#[derive(Clone)]
pub struct NamespaceProvisioner {
    storage: Arc<dyn Storage>,
    layout: StorageLayout,
}

impl NamespaceProvisioner {
    /// Creates a provisioner over `storage` using `layout`
    pub fn new(storage: Arc<dyn Storage>, layout: StorageLayout) -> Self {
        NamespaceProvisioner { storage, layout }
    }

    /// Storage layout in use
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Ensures the tenant root and its category directories exist
    ///
    /// # Returns
    ///
    /// True if any directory had to be created
    pub async fn ensure_tenant_namespace(&self, tenant_code: &str) -> AdminResult<bool> {
        let mut created = false;

        for dir in [
            self.layout.tenant_dir(tenant_code),
            self.layout.resource_dir(tenant_code),
            self.layout.udf_dir(tenant_code),
        ] {
            if !self.storage.exists(&dir).await? {
                self.storage.mkdir(&dir).await?;
                created = true;
            }
        }

        if created {
            tracing::info!(tenant = %tenant_code, "Provisioned tenant namespace");
        }

        Ok(created)
    }

    /// Ensures an account's home directory exists under a tenant
    ///
    /// # Returns
    ///
    /// True if the directory had to be created
    pub async fn ensure_home(&self, tenant_code: &str, account_id: i32) -> AdminResult<bool> {
        let home = self.layout.home_dir(tenant_code, account_id);

        if self.storage.exists(&home).await? {
            return Ok(false);
        }

        self.storage.mkdir(&home).await?;
        tracing::debug!(tenant = %tenant_code, account_id, home = %home, "Created home directory");
        Ok(true)
    }

    /// Recursively removes an account's home directory under a tenant
    ///
    /// # Returns
    ///
    /// False if there was nothing to remove
    pub async fn remove_home(&self, tenant_code: &str, account_id: i32) -> AdminResult<bool> {
        let home = self.layout.home_dir(tenant_code, account_id);
        let removed = self.storage.delete(&home, true).await?;

        tracing::debug!(tenant = %tenant_code, account_id, removed, "Removed home directory");
        Ok(removed)
    }

    /// Whether the tenant's category directory for files exists
    pub async fn has_resource_dir(&self, tenant_code: &str) -> AdminResult<bool> {
        Ok(self
            .storage
            .exists(&self.layout.resource_dir(tenant_code))
            .await?)
    }
}
