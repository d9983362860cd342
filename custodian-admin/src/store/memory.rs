/// In-memory account store
///
/// Backs the test suites. Seed it with the `add_*` helpers, then assert on
/// [`MemoryAccountStore::grants`] and [`MemoryAccountStore::grant_writes`].
/// [`MemoryAccountStore::fail_account_saves`] makes `save_account` fail, to
/// exercise the paths that run after storage side effects.

use super::{AccountStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use custodian_shared::models::account::{Account, AccountState, AccountType, CreateAccount};
use custodian_shared::models::grant::{GrantKind, GrantTarget, NewGrant, Permission};
use custodian_shared::models::project::Project;
use custodian_shared::models::resource::{Resource, ResourceKind};
use custodian_shared::models::tenant::Tenant;
use custodian_shared::models::workflow::DefinitionUsage;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<i32, Account>,
    tenants: BTreeMap<i32, Tenant>,
    resources: Vec<Resource>,
    targets: HashSet<(GrantKind, i32)>,
    projects: Vec<Project>,
    grants: HashMap<(i32, GrantKind), BTreeMap<i32, Permission>>,
    usages: Vec<(i32, DefinitionUsage)>,
    next_account_id: i32,
    next_tenant_id: i32,
    grant_writes: usize,
    fail_account_saves: bool,
}

/// In-memory [`AccountStore`] implementation
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: Mutex<State>,
}

impl MemoryAccountStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Adds a tenant with the next free ID
    pub fn add_tenant(&self, tenant_code: &str) -> Tenant {
        self.with_state(|state| {
            state.next_tenant_id += 1;
            let tenant = Tenant {
                id: state.next_tenant_id,
                tenant_code: tenant_code.to_string(),
                description: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            state.tenants.insert(tenant.id, tenant.clone());
            tenant
        })
    }

    /// Adds an active account with the next free ID
    pub fn add_account(
        &self,
        user_name: &str,
        tenant_id: Option<i32>,
        account_type: AccountType,
    ) -> Account {
        self.with_state(|state| {
            state.next_account_id += 1;
            let account = Account {
                id: state.next_account_id,
                user_name: user_name.to_string(),
                password_hash: String::new(),
                email: format!("{}@example.com", user_name),
                phone: None,
                tenant_id,
                account_type,
                state: AccountState::Active,
                queue: String::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            state.accounts.insert(account.id, account.clone());
            account
        })
    }

    /// Adds a resource record
    pub fn add_resource(
        &self,
        id: i32,
        pid: Option<i32>,
        full_name: &str,
        is_directory: bool,
        kind: ResourceKind,
        owner_id: i32,
    ) -> Resource {
        let resource = Resource {
            id,
            pid,
            full_name: full_name.to_string(),
            is_directory,
            kind,
            owner_id,
            size: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.with_state(|state| state.resources.push(resource.clone()));
        resource
    }

    /// Registers a UDF function or data source target
    pub fn add_target(&self, kind: GrantKind, id: i32) {
        self.with_state(|state| {
            state.targets.insert((kind, id));
        });
    }

    /// Adds a project
    pub fn add_project(&self, id: i32, code: i64, name: &str, owner_id: i32) -> Project {
        let project = Project {
            id,
            code,
            name: name.to_string(),
            owner_id,
        };
        self.with_state(|state| state.projects.push(project.clone()));
        project
    }

    /// Records that a released definition of `owner_id` references a resource
    pub fn add_usage(&self, owner_id: i32, resource_id: i32, definition_code: i64) {
        self.with_state(|state| {
            state.usages.push((
                owner_id,
                DefinitionUsage {
                    resource_id,
                    definition_code,
                },
            ))
        });
    }

    /// Seeds grants without counting a write
    pub fn seed_grants(&self, account_id: i32, kind: GrantKind, grants: &[NewGrant]) {
        self.with_state(|state| {
            let set = state.grants.entry((account_id, kind)).or_default();
            for grant in grants {
                set.insert(grant.target_id, grant.permission);
            }
        });
    }

    /// Grants of one kind held by an account, ordered by target ID
    pub fn grants(&self, account_id: i32, kind: GrantKind) -> Vec<NewGrant> {
        self.with_state(|state| {
            state
                .grants
                .get(&(account_id, kind))
                .map(|set| {
                    set.iter()
                        .map(|(target_id, permission)| NewGrant {
                            target_id: *target_id,
                            permission: *permission,
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Number of grant mutations performed through the trait
    pub fn grant_writes(&self) -> usize {
        self.with_state(|state| state.grant_writes)
    }

    /// Current record of an account
    pub fn account(&self, id: i32) -> Option<Account> {
        self.with_state(|state| state.accounts.get(&id).cloned())
    }

    /// Makes `save_account` fail while set
    pub fn fail_account_saves(&self, fail: bool) {
        self.with_state(|state| state.fail_account_saves = fail);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_account(&self, id: i32) -> StoreResult<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_name(&self, user_name: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|account| account.user_name == user_name)
            .cloned())
    }

    async fn insert_account(&self, data: CreateAccount) -> StoreResult<Account> {
        let mut state = self.lock()?;

        if state
            .accounts
            .values()
            .any(|account| account.user_name == data.user_name)
        {
            return Err(StoreError::Conflict(format!(
                "user_name '{}' exists",
                data.user_name
            )));
        }

        state.next_account_id += 1;
        let account = Account {
            id: state.next_account_id,
            user_name: data.user_name,
            password_hash: data.password_hash,
            email: data.email,
            phone: data.phone,
            tenant_id: data.tenant_id,
            account_type: AccountType::General,
            state: data.state,
            queue: data.queue,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn save_account(&self, account: &Account) -> StoreResult<bool> {
        let mut state = self.lock()?;

        if state.fail_account_saves {
            return Err(StoreError::Unavailable("account saves disabled".to_string()));
        }

        match state.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_account(&self, id: i32) -> StoreResult<bool> {
        let mut state = self.lock()?;
        state.grants.retain(|(account_id, _), _| *account_id != id);
        Ok(state.accounts.remove(&id).is_some())
    }

    async fn find_tenant(&self, id: i32) -> StoreResult<Option<Tenant>> {
        Ok(self.lock()?.tenants.get(&id).cloned())
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        Ok(self.lock()?.tenants.values().cloned().collect())
    }

    async fn list_resources(&self, owner_id: i32, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        Ok(self
            .lock()?
            .resources
            .iter()
            .filter(|resource| resource.owner_id == owner_id && resource.kind == kind)
            .cloned()
            .collect())
    }

    async fn find_grant_target(&self, kind: GrantKind, id: i32) -> StoreResult<Option<GrantTarget>> {
        let state = self.lock()?;

        let target = match kind {
            GrantKind::Resource => state
                .resources
                .iter()
                .find(|resource| resource.id == id)
                .map(|resource| GrantTarget {
                    id,
                    is_directory: resource.is_directory,
                }),
            GrantKind::Project => state
                .projects
                .iter()
                .find(|project| project.id == id)
                .map(|_| GrantTarget {
                    id,
                    is_directory: false,
                }),
            GrantKind::UdfFunction | GrantKind::DataSource => {
                state.targets.contains(&(kind, id)).then_some(GrantTarget {
                    id,
                    is_directory: false,
                })
            }
        };

        Ok(target)
    }

    async fn list_granted_ids(&self, account_id: i32, kind: GrantKind) -> StoreResult<Vec<i32>> {
        Ok(self
            .lock()?
            .grants
            .get(&(account_id, kind))
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn replace_grants(
        &self,
        account_id: i32,
        kind: GrantKind,
        grants: &[NewGrant],
    ) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.grant_writes += 1;
        state.grants.insert(
            (account_id, kind),
            grants
                .iter()
                .map(|grant| (grant.target_id, grant.permission))
                .collect(),
        );
        Ok(())
    }

    async fn upsert_grant(&self, account_id: i32, kind: GrantKind, grant: NewGrant) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.grant_writes += 1;
        state
            .grants
            .entry((account_id, kind))
            .or_default()
            .insert(grant.target_id, grant.permission);
        Ok(())
    }

    async fn revoke_grant(&self, account_id: i32, kind: GrantKind, target_id: i32) -> StoreResult<bool> {
        let mut state = self.lock()?;
        state.grant_writes += 1;
        Ok(state
            .grants
            .get_mut(&(account_id, kind))
            .map(|set| set.remove(&target_id).is_some())
            .unwrap_or(false))
    }

    async fn list_definition_usages(&self, owner_id: i32) -> StoreResult<Vec<DefinitionUsage>> {
        Ok(self
            .lock()?
            .usages
            .iter()
            .filter(|(owner, _)| *owner == owner_id)
            .map(|(_, usage)| *usage)
            .collect())
    }

    async fn find_project_by_code(&self, code: i64) -> StoreResult<Option<Project>> {
        Ok(self
            .lock()?
            .projects
            .iter()
            .find(|project| project.code == code)
            .cloned())
    }

    async fn list_projects_created_by(&self, owner_id: i32) -> StoreResult<Vec<Project>> {
        Ok(self
            .lock()?
            .projects
            .iter()
            .filter(|project| project.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_name() {
        let store = MemoryAccountStore::new();
        store.add_account("jdoe", None, AccountType::General);

        let result = store
            .insert_account(CreateAccount {
                user_name: "jdoe".to_string(),
                password_hash: String::new(),
                email: "jdoe@example.com".to_string(),
                phone: None,
                tenant_id: None,
                state: AccountState::Pending,
                queue: String::new(),
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_replace_grants_counts_writes() {
        let store = MemoryAccountStore::new();
        store.seed_grants(1, GrantKind::Resource, &[NewGrant { target_id: 3, permission: Permission::Writable }]);
        assert_eq!(store.grant_writes(), 0);

        store
            .replace_grants(1, GrantKind::Resource, &[NewGrant { target_id: 4, permission: Permission::Readable }])
            .await
            .unwrap();

        assert_eq!(store.grant_writes(), 1);
        assert_eq!(store.list_granted_ids(1, GrantKind::Resource).await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_delete_account_drops_grants() {
        let store = MemoryAccountStore::new();
        let account = store.add_account("jdoe", None, AccountType::General);
        store.seed_grants(account.id, GrantKind::DataSource, &[NewGrant { target_id: 1, permission: Permission::Writable }]);

        assert!(store.delete_account(account.id).await.unwrap());
        assert!(store.grants(account.id, GrantKind::DataSource).is_empty());
        assert!(!store.delete_account(account.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let store = MemoryAccountStore::new();
        let account = store.add_account("jdoe", None, AccountType::General);
        store.fail_account_saves(true);

        assert!(store.save_account(&account).await.is_err());

        store.fail_account_saves(false);
        assert!(store.save_account(&account).await.unwrap());
    }
}
