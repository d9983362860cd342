/// Account store seam
///
/// Account administration reads and writes metadata through the
/// [`AccountStore`] trait. Two implementations ship with the crate:
///
/// - [`PgAccountStore`]: PostgreSQL via the `custodian-shared` models
/// - [`MemoryAccountStore`]: in-process maps with failure injection, for tests
///
/// # Example
///
/// ```no_run
/// use custodian_admin::store::{AccountStore, PgAccountStore};
/// use custodian_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/custodian")).await?;
/// let store = PgAccountStore::new(pool);
///
/// if let Some(account) = store.find_account_by_name("jdoe").await? {
///     println!("{} is in tenant {:?}", account.user_name, account.tenant_id);
/// }
/// # Ok(())
/// # }
/// ```

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use async_trait::async_trait;
use custodian_shared::models::account::{Account, CreateAccount};
use custodian_shared::models::grant::{GrantKind, GrantTarget, NewGrant};
use custodian_shared::models::project::Project;
use custodian_shared::models::resource::{Resource, ResourceKind};
use custodian_shared::models::tenant::Tenant;
use custodian_shared::models::workflow::DefinitionUsage;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Write conflicted with existing data
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata operations consumed by account administration
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds an account by ID
    async fn find_account(&self, id: i32) -> StoreResult<Option<Account>>;

    /// Finds an account by user name
    async fn find_account_by_name(&self, user_name: &str) -> StoreResult<Option<Account>>;

    /// Inserts a general account
    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account>;

    /// Persists every mutable field of an account
    ///
    /// # Returns
    ///
    /// False if the account no longer exists
    async fn save_account(&self, account: &Account) -> StoreResult<bool>;

    /// Deletes an account together with its grants
    async fn delete_account(&self, id: i32) -> StoreResult<bool>;

    /// Finds a tenant by ID
    async fn find_tenant(&self, id: i32) -> StoreResult<Option<Tenant>>;

    /// Lists every tenant
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;

    /// Lists the resources of one category owned by an account
    async fn list_resources(&self, owner_id: i32, kind: ResourceKind) -> StoreResult<Vec<Resource>>;

    /// Resolves a grant target
    async fn find_grant_target(&self, kind: GrantKind, id: i32) -> StoreResult<Option<GrantTarget>>;

    /// Lists the target IDs of one kind granted to an account
    async fn list_granted_ids(&self, account_id: i32, kind: GrantKind) -> StoreResult<Vec<i32>>;

    /// Atomically replaces every grant of one kind held by an account
    async fn replace_grants(
        &self,
        account_id: i32,
        kind: GrantKind,
        grants: &[NewGrant],
    ) -> StoreResult<()>;

    /// Inserts or refreshes a single grant
    async fn upsert_grant(&self, account_id: i32, kind: GrantKind, grant: NewGrant) -> StoreResult<()>;

    /// Deletes a single grant
    async fn revoke_grant(&self, account_id: i32, kind: GrantKind, target_id: i32) -> StoreResult<bool>;

    /// Lists resource references of the released definitions owned by an account
    async fn list_definition_usages(&self, owner_id: i32) -> StoreResult<Vec<DefinitionUsage>>;

    /// Finds a project by code
    async fn find_project_by_code(&self, code: i64) -> StoreResult<Option<Project>>;

    /// Lists projects created by an account
    async fn list_projects_created_by(&self, owner_id: i32) -> StoreResult<Vec<Project>>;
}
