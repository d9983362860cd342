/// Tenant migration orchestrator
///
/// Moves an account's stored files when its tenant changes. Runs in three
/// phases so metadata is only touched once storage work is done:
///
/// ```text
/// 1. plan     resolve old and new tenants, build file and UDF forests
/// 2. storage  replicate each category old -> new, remove old home,
///             provision new namespace and home
/// 3. commit   save the account with the new tenant reference
/// ```
///
/// A failure in phase 2 leaves the stored account untouched (partial copies
/// may remain in the new namespace). A failure in phase 3 compensates before
/// the error is returned: the old home directory is recreated empty and a
/// home directory created under the new tenant is removed again. Content of
/// the old home directory is not restored, and replicated files stay in the
/// new tenant's category directories.
///
/// When resource upload is disabled, or the account had no resolvable
/// tenant, phase 2 does not copy anything.
///
/// # Example
///
/// ```no_run
/// use custodian_admin::config::ServiceSettings;
/// use custodian_admin::migration::TenantMigrator;
/// use custodian_admin::store::{AccountStore, MemoryAccountStore};
/// use custodian_shared::storage::{MemoryStorage, StorageLayout};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryAccountStore::new());
/// let migrator = TenantMigrator::new(
///     store.clone(),
///     Arc::new(MemoryStorage::new()),
///     StorageLayout::new("/custodian"),
///     ServiceSettings::default(),
/// );
///
/// let account = store.find_account(7).await?.expect("account exists");
/// let (account, report) = migrator.migrate(account, 2).await?;
/// println!("now in tenant {:?}, copied {} files", account.tenant_id, report.files.files_copied);
/// # Ok(())
/// # }
/// ```

use crate::config::ServiceSettings;
use crate::error::{AdminError, AdminResult};
use crate::namespace::NamespaceProvisioner;
use crate::replicator::{ReplicationReport, Replicator};
use crate::store::AccountStore;
use crate::tree::{build_forest, forest_size, ResourceNode};
use custodian_shared::models::account::Account;
use custodian_shared::models::resource::ResourceKind;
use custodian_shared::models::tenant::Tenant;
use custodian_shared::storage::{Storage, StorageLayout};
use std::sync::Arc;

/// What a migration did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Previous tenant code, if it resolved
    pub from_tenant: Option<String>,

    /// New tenant code
    pub to_tenant: String,

    /// File category replication
    pub files: ReplicationReport,

    /// UDF category replication
    pub udfs: ReplicationReport,

    /// Old namespace was missing and got provisioned instead of migrated
    pub old_namespace_provisioned: bool,

    /// Old home directory was removed
    pub old_home_removed: bool,

    /// Home directory under the new tenant was created
    pub new_home_created: bool,
}

/// Validated input of the storage phase
struct MigrationPlan {
    old_tenant: Option<Tenant>,
    new_tenant: Tenant,
    forests: Vec<(ResourceKind, Vec<ResourceNode>)>,
}

/// Moves account files between tenant namespaces
#[derive(Clone)]
pub struct TenantMigrator {
    store: Arc<dyn AccountStore>,
    provisioner: NamespaceProvisioner,
    replicator: Replicator,
    settings: ServiceSettings,
}

impl TenantMigrator {
    /// Creates a migrator
    pub fn new(
        store: Arc<dyn AccountStore>,
        storage: Arc<dyn Storage>,
        layout: StorageLayout,
        settings: ServiceSettings,
    ) -> Self {
        TenantMigrator {
            store,
            provisioner: NamespaceProvisioner::new(storage.clone(), layout),
            replicator: Replicator::new(storage),
            settings,
        }
    }

    /// Namespace provisioner shared with account flows
    pub fn provisioner(&self) -> &NamespaceProvisioner {
        &self.provisioner
    }

    /// Moves `account` to `new_tenant_id` and persists it
    ///
    /// `account.tenant_id` must still hold the current tenant. Other fields
    /// of `account` are saved along with the new tenant reference.
    ///
    /// # Errors
    ///
    /// - `TargetNotFound` if the new tenant does not exist (nothing happens)
    /// - `ResourceMissing` / `StorageUnavailable` from the storage phase
    /// - `Store` if the account cannot be saved
    pub async fn migrate(
        &self,
        mut account: Account,
        new_tenant_id: i32,
    ) -> AdminResult<(Account, MigrationReport)> {
        let plan = self.plan(&account, new_tenant_id).await?;

        let mut report = MigrationReport {
            from_tenant: plan.old_tenant.as_ref().map(|t| t.tenant_code.clone()),
            to_tenant: plan.new_tenant.tenant_code.clone(),
            ..MigrationReport::default()
        };

        if self.settings.resource_upload_enabled {
            self.move_storage(&account, &plan, &mut report).await?;
        }

        account.tenant_id = Some(plan.new_tenant.id);
        if let Err(e) = self.commit(&account).await {
            self.compensate(&account, &plan, &report).await;
            return Err(e);
        }

        tracing::info!(
            account_id = account.id,
            from = ?report.from_tenant,
            to = %report.to_tenant,
            files = report.files.files_copied,
            udfs = report.udfs.files_copied,
            "Account moved to new tenant"
        );

        Ok((account, report))
    }

    async fn plan(&self, account: &Account, new_tenant_id: i32) -> AdminResult<MigrationPlan> {
        let new_tenant = self
            .store
            .find_tenant(new_tenant_id)
            .await?
            .ok_or_else(|| AdminError::tenant_not_found(new_tenant_id))?;

        let old_tenant = match account.tenant_id {
            Some(id) => self.store.find_tenant(id).await?,
            None => None,
        };

        let mut forests = Vec::new();
        if self.settings.resource_upload_enabled && old_tenant.is_some() {
            for kind in ResourceKind::ALL {
                let resources = self.store.list_resources(account.id, kind).await?;
                forests.push((kind, build_forest(resources)));
            }
        }

        Ok(MigrationPlan {
            old_tenant,
            new_tenant,
            forests,
        })
    }

    async fn move_storage(
        &self,
        account: &Account,
        plan: &MigrationPlan,
        report: &mut MigrationReport,
    ) -> AdminResult<()> {
        let layout = self.provisioner.layout();
        let new_code = &plan.new_tenant.tenant_code;

        if let Some(old) = &plan.old_tenant {
            let old_code = &old.tenant_code;

            if self.provisioner.has_resource_dir(old_code).await? {
                for (kind, forest) in &plan.forests {
                    if forest.is_empty() {
                        continue;
                    }

                    tracing::debug!(
                        account_id = account.id,
                        category = %kind,
                        nodes = forest_size(forest),
                        "Replicating category"
                    );

                    let replicated = self
                        .replicator
                        .replicate(
                            forest,
                            &layout.category_dir(old_code, *kind),
                            &layout.category_dir(new_code, *kind),
                        )
                        .await?;

                    match kind {
                        ResourceKind::File => report.files = replicated,
                        ResourceKind::Udf => report.udfs = replicated,
                    }
                }

                report.old_home_removed = self.provisioner.remove_home(old_code, account.id).await?;
            } else {
                tracing::warn!(
                    account_id = account.id,
                    tenant = %old_code,
                    "Old tenant namespace missing, provisioning it instead of migrating"
                );
                self.provisioner.ensure_tenant_namespace(old_code).await?;
                report.old_namespace_provisioned = true;
            }
        }

        self.provisioner.ensure_tenant_namespace(new_code).await?;
        report.new_home_created = self.provisioner.ensure_home(new_code, account.id).await?;

        Ok(())
    }

    async fn commit(&self, account: &Account) -> AdminResult<()> {
        if self.store.save_account(account).await? {
            Ok(())
        } else {
            Err(AdminError::account_not_found(account.id))
        }
    }

    async fn compensate(&self, account: &Account, plan: &MigrationPlan, report: &MigrationReport) {
        if report.new_home_created {
            let new_code = &plan.new_tenant.tenant_code;
            if let Err(e) = self.provisioner.remove_home(new_code, account.id).await {
                tracing::warn!(
                    account_id = account.id,
                    tenant = %new_code,
                    error = %e,
                    "Account save failed after migration and new home could not be removed"
                );
            }
        }

        let Some(old) = plan.old_tenant.as_ref().filter(|_| report.old_home_removed) else {
            return;
        };

        match self.provisioner.ensure_home(&old.tenant_code, account.id).await {
            Ok(_) => tracing::warn!(
                account_id = account.id,
                tenant = %old.tenant_code,
                "Account save failed after migration, old home directory re-provisioned"
            ),
            Err(e) => tracing::warn!(
                account_id = account.id,
                tenant = %old.tenant_code,
                error = %e,
                "Account save failed after migration and old home could not be re-provisioned"
            ),
        }
    }
}
