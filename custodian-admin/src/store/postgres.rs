/// PostgreSQL-backed account store

use super::{AccountStore, StoreResult};
use async_trait::async_trait;
use custodian_shared::models::account::{Account, CreateAccount};
use custodian_shared::models::grant::{Grant, GrantKind, GrantTarget, NewGrant};
use custodian_shared::models::project::Project;
use custodian_shared::models::resource::{Resource, ResourceKind};
use custodian_shared::models::tenant::Tenant;
use custodian_shared::models::workflow::DefinitionUsage;
use sqlx::PgPool;

/// [`AccountStore`] over a connection pool
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Creates a store with the provided connection pool
    pub fn new(pool: PgPool) -> Self {
        PgAccountStore { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_account(&self, id: i32) -> StoreResult<Option<Account>> {
        Ok(Account::find_by_id(&self.pool, id).await?)
    }

    async fn find_account_by_name(&self, user_name: &str) -> StoreResult<Option<Account>> {
        Ok(Account::find_by_name(&self.pool, user_name).await?)
    }

    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account> {
        Ok(Account::create(&self.pool, data).await?)
    }

    async fn save_account(&self, account: &Account) -> StoreResult<bool> {
        Ok(Account::save(&self.pool, account).await?)
    }

    async fn delete_account(&self, id: i32) -> StoreResult<bool> {
        Ok(Account::delete(&self.pool, id).await?)
    }

    async fn find_tenant(&self, id: i32) -> StoreResult<Option<Tenant>> {
        Ok(Tenant::find_by_id(&self.pool, id).await?)
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        Ok(Tenant::list(&self.pool).await?)
    }

    async fn list_resources(&self, owner_id: i32, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        Ok(Resource::list_by_owner(&self.pool, owner_id, kind).await?)
    }

    async fn find_grant_target(&self, kind: GrantKind, id: i32) -> StoreResult<Option<GrantTarget>> {
        Ok(GrantTarget::find(&self.pool, kind, id).await?)
    }

    async fn list_granted_ids(&self, account_id: i32, kind: GrantKind) -> StoreResult<Vec<i32>> {
        Ok(Grant::list_target_ids(&self.pool, account_id, kind).await?)
    }

    async fn replace_grants(
        &self,
        account_id: i32,
        kind: GrantKind,
        grants: &[NewGrant],
    ) -> StoreResult<()> {
        Ok(Grant::replace_all(&self.pool, account_id, kind, grants).await?)
    }

    async fn upsert_grant(&self, account_id: i32, kind: GrantKind, grant: NewGrant) -> StoreResult<()> {
        Ok(Grant::upsert(&self.pool, account_id, kind, grant).await?)
    }

    async fn revoke_grant(&self, account_id: i32, kind: GrantKind, target_id: i32) -> StoreResult<bool> {
        Ok(Grant::delete(&self.pool, account_id, kind, target_id).await?)
    }

    async fn list_definition_usages(&self, owner_id: i32) -> StoreResult<Vec<DefinitionUsage>> {
        Ok(DefinitionUsage::list_released_by_owner(&self.pool, owner_id).await?)
    }

    async fn find_project_by_code(&self, code: i64) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_code(&self.pool, code).await?)
    }

    async fn list_projects_created_by(&self, owner_id: i32) -> StoreResult<Vec<Project>> {
        Ok(Project::list_created_by(&self.pool, owner_id).await?)
    }
}
