/// Account administration service
///
/// Entry points for managing accounts and their grants on behalf of an
/// acting account. Every operation checks the actor's role first, validates
/// its input, and only then touches the store or storage.
///
/// # Operations
///
/// | Operation | Who |
/// |-----------|-----|
/// | `create_account`, `delete_account` | administrator |
/// | `register_account` | anyone (account starts pending) |
/// | `update_account` | the account itself or an administrator |
/// | `activate_account`, `batch_activate` | administrator |
/// | `grant_resources`, `grant_udf_functions`, `grant_data_sources`, `grant_projects` | administrator |
/// | `grant_project_by_code` | project creator or administrator |
/// | `revoke_project` | administrator |
///
/// # Example
///
/// ```no_run
/// use custodian_admin::accounts::{AccountService, NewAccount};
/// use custodian_admin::config::ServiceSettings;
/// use custodian_admin::store::{AccountStore, MemoryAccountStore};
/// use custodian_shared::storage::{MemoryStorage, StorageLayout};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryAccountStore::new());
/// let service = AccountService::new(
///     store.clone(),
///     Arc::new(MemoryStorage::new()),
///     StorageLayout::new("/custodian"),
///     ServiceSettings::default(),
/// );
///
/// let admin = store.find_account_by_name("admin").await?.expect("seeded");
/// let account = service
///     .create_account(&admin, NewAccount {
///         user_name: "jdoe".to_string(),
///         password: "Str0ng!pass".to_string(),
///         email: "jdoe@example.com".to_string(),
///         phone: None,
///         tenant_id: 1,
///         queue: String::new(),
///     })
///     .await?;
///
/// service.grant_resources(&admin, account.id, "1-4-9,12").await?;
/// # Ok(())
/// # }
/// ```

use crate::config::ServiceSettings;
use crate::error::{AdminError, AdminResult, TargetRef};
use crate::migration::TenantMigrator;
use crate::namespace::NamespaceProvisioner;
use crate::reconciler::{parse_ids_for, ReconcileOutcome, Reconciler, UsageIndex};
use crate::store::{AccountStore, StoreError};
use custodian_shared::auth::authorization::{
    require_administrator, require_project_creator, require_self_or_administrator,
};
use custodian_shared::auth::password::{hash_password, validate_password_strength};
use custodian_shared::models::account::{Account, AccountState, CreateAccount};
use custodian_shared::models::grant::{GrantKind, NewGrant, Permission};
use custodian_shared::models::project::Project;
use custodian_shared::models::tenant::Tenant;
use custodian_shared::storage::{Storage, StorageLayout};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Account creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    /// Unique user name
    #[validate(length(min = 3, max = 39, message = "User name must be 3-39 characters"))]
    pub user_name: String,

    /// Plain-text password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Optional phone number
    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    /// Tenant the account belongs to
    pub tenant_id: i32,

    /// Queue label
    #[serde(default)]
    pub queue: String,
}

/// Self-service registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    /// Unique user name
    #[validate(length(min = 3, max = 39, message = "User name must be 3-39 characters"))]
    pub user_name: String,

    /// Plain-text password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Password confirmation
    pub repeat_password: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Partial account update; `None` leaves a field as is
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AccountUpdate {
    /// New user name
    #[validate(length(min = 3, max = 39, message = "User name must be 3-39 characters"))]
    pub user_name: Option<String>,

    /// New plain-text password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New phone number; an empty string clears it
    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    /// New tenant; triggers a storage migration when it differs
    pub tenant_id: Option<i32>,

    /// New queue label
    pub queue: Option<String>,

    /// New activation state
    pub state: Option<AccountState>,
}

/// Per-name result of [`AccountService::batch_activate`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchActivation {
    /// Names that were activated
    pub activated: Vec<String>,

    /// Names that failed, with the reason
    pub failed: Vec<(String, String)>,
}

fn check_user_name(user_name: &str) -> AdminResult<()> {
    let valid_chars = user_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid_chars && (3..=39).contains(&user_name.len()) {
        Ok(())
    } else {
        Err(AdminError::InvalidArgument(format!(
            "invalid user name '{}'",
            user_name
        )))
    }
}

fn check_phone(phone: &str) -> AdminResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ' ') {
        Ok(())
    } else {
        Err(AdminError::InvalidArgument(format!("invalid phone '{}'", phone)))
    }
}

fn check_password(password: &str) -> AdminResult<String> {
    validate_password_strength(password).map_err(AdminError::InvalidArgument)?;
    Ok(hash_password(password)?)
}

/// Account and grant management entry points
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    migrator: TenantMigrator,
    reconciler: Reconciler,
    settings: ServiceSettings,
}

impl AccountService {
    /// Creates the service
    pub fn new(
        store: Arc<dyn AccountStore>,
        storage: Arc<dyn Storage>,
        layout: StorageLayout,
        settings: ServiceSettings,
    ) -> Self {
        AccountService {
            migrator: TenantMigrator::new(store.clone(), storage, layout, settings),
            reconciler: Reconciler::new(store.clone()),
            store,
            settings,
        }
    }

    fn provisioner(&self) -> &NamespaceProvisioner {
        self.migrator.provisioner()
    }

    async fn account(&self, id: i32) -> AdminResult<Account> {
        self.store
            .find_account(id)
            .await?
            .ok_or_else(|| AdminError::account_not_found(id))
    }

    async fn tenant(&self, id: i32) -> AdminResult<Tenant> {
        self.store
            .find_tenant(id)
            .await?
            .ok_or_else(|| AdminError::tenant_not_found(id))
    }

    async fn project(&self, code: i64) -> AdminResult<Project> {
        self.store
            .find_project_by_code(code)
            .await?
            .ok_or(AdminError::TargetNotFound(TargetRef::Project(code)))
    }

    /// Removes an account whose creation could not be completed
    async fn discard(&self, account: &Account) {
        match self.store.delete_account(account.id).await {
            Ok(_) => tracing::warn!(
                account_id = account.id,
                user_name = %account.user_name,
                "Home directory could not be created, account creation rolled back"
            ),
            Err(e) => tracing::error!(
                account_id = account.id,
                user_name = %account.user_name,
                error = %e,
                "Home directory could not be created and the account could not be removed"
            ),
        }
    }

    async fn ensure_name_free(&self, user_name: &str) -> AdminResult<()> {
        match self.store.find_account_by_name(user_name).await? {
            Some(_) => Err(AdminError::NameTaken(user_name.to_string())),
            None => Ok(()),
        }
    }

    async fn insert(&self, data: CreateAccount) -> AdminResult<Account> {
        let user_name = data.user_name.clone();
        match self.store.insert_account(data).await {
            Ok(account) => Ok(account),
            Err(StoreError::Conflict(_)) => Err(AdminError::NameTaken(user_name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates an active general account
    ///
    /// With resource upload enabled, the tenant namespace is provisioned
    /// before the account is stored and the home directory right after. If
    /// the home directory cannot be created the stored account is removed
    /// again, so a failed creation can be retried under the same name.
    pub async fn create_account(&self, actor: &Account, request: NewAccount) -> AdminResult<Account> {
        require_administrator(actor)?;
        request.validate()?;
        check_user_name(&request.user_name)?;
        if let Some(phone) = request.phone.as_deref().filter(|p| !p.is_empty()) {
            check_phone(phone)?;
        }

        let tenant = self.tenant(request.tenant_id).await?;
        self.ensure_name_free(&request.user_name).await?;
        let password_hash = check_password(&request.password)?;

        if self.settings.resource_upload_enabled {
            self.provisioner()
                .ensure_tenant_namespace(&tenant.tenant_code)
                .await?;
        }

        let account = self
            .insert(CreateAccount {
                user_name: request.user_name,
                password_hash,
                email: request.email,
                phone: request.phone.filter(|p| !p.is_empty()),
                tenant_id: Some(tenant.id),
                state: AccountState::Active,
                queue: request.queue,
            })
            .await?;

        if self.settings.resource_upload_enabled {
            if let Err(e) = self
                .provisioner()
                .ensure_home(&tenant.tenant_code, account.id)
                .await
            {
                self.discard(&account).await;
                return Err(e);
            }
        }

        tracing::info!(
            account_id = account.id,
            user_name = %account.user_name,
            tenant = %tenant.tenant_code,
            actor = actor.id,
            "Account created"
        );

        Ok(account)
    }

    /// Registers a pending account in the default tenant
    pub async fn register_account(&self, request: Registration) -> AdminResult<Account> {
        request.validate()?;
        check_user_name(&request.user_name)?;

        if request.password != request.repeat_password {
            return Err(AdminError::InvalidArgument(
                "passwords do not match".to_string(),
            ));
        }

        let tenant = self.tenant(self.settings.default_tenant_id).await?;
        self.ensure_name_free(&request.user_name).await?;
        let password_hash = check_password(&request.password)?;

        let account = self
            .insert(CreateAccount {
                user_name: request.user_name,
                password_hash,
                email: request.email,
                phone: None,
                tenant_id: Some(tenant.id),
                state: AccountState::Pending,
                queue: String::new(),
            })
            .await?;

        tracing::info!(
            account_id = account.id,
            user_name = %account.user_name,
            "Account registered, pending activation"
        );

        Ok(account)
    }

    /// Applies a partial update
    ///
    /// A tenant change moves the account's stored files first; if that fails
    /// no field of the update is saved.
    pub async fn update_account(
        &self,
        actor: &Account,
        account_id: i32,
        update: AccountUpdate,
    ) -> AdminResult<Account> {
        require_self_or_administrator(actor, account_id)?;
        update.validate()?;

        let mut account = self.account(account_id).await?;

        if let Some(user_name) = update.user_name {
            if user_name != account.user_name {
                check_user_name(&user_name)?;
                self.ensure_name_free(&user_name).await?;
                account.user_name = user_name;
            }
        }

        if let Some(password) = update.password {
            account.password_hash = check_password(&password)?;
        }

        if let Some(email) = update.email {
            account.email = email;
        }

        if let Some(phone) = update.phone {
            if phone.is_empty() {
                account.phone = None;
            } else {
                check_phone(&phone)?;
                account.phone = Some(phone);
            }
        }

        if let Some(queue) = update.queue {
            account.queue = queue;
        }

        if let Some(state) = update.state {
            if state != account.state {
                require_administrator(actor)?;
                if actor.id == account_id && state == AccountState::Pending {
                    return Err(AdminError::InvalidArgument(
                        "an account may not deactivate itself".to_string(),
                    ));
                }
                account.state = state;
            }
        }

        account.updated_at = chrono::Utc::now();

        let account = match update.tenant_id {
            Some(tenant_id) if Some(tenant_id) != account.tenant_id => {
                let (account, _) = self.migrator.migrate(account, tenant_id).await?;
                account
            }
            _ => {
                if !self.store.save_account(&account).await? {
                    return Err(AdminError::account_not_found(account_id));
                }
                account
            }
        };

        tracing::info!(account_id, actor = actor.id, "Account updated");
        Ok(account)
    }

    /// Deletes an account that owns no projects
    ///
    /// With resource upload enabled, the account's home directory is removed
    /// first.
    pub async fn delete_account(&self, actor: &Account, account_id: i32) -> AdminResult<()> {
        require_administrator(actor)?;
        let account = self.account(account_id).await?;

        let projects = self.store.list_projects_created_by(account_id).await?;
        if !projects.is_empty() {
            return Err(AdminError::OwnsProjects(
                projects.into_iter().map(|p| p.name).collect(),
            ));
        }

        if self.settings.resource_upload_enabled {
            if let Some(tenant_id) = account.tenant_id {
                match self.store.find_tenant(tenant_id).await? {
                    Some(tenant) => {
                        self.provisioner()
                            .remove_home(&tenant.tenant_code, account_id)
                            .await?;
                    }
                    None => tracing::warn!(
                        account_id,
                        tenant_id,
                        "Tenant of deleted account not found, home directory left in place"
                    ),
                }
            }
        }

        if !self.store.delete_account(account_id).await? {
            return Err(AdminError::account_not_found(account_id));
        }

        tracing::info!(account_id, actor = actor.id, "Account deleted");
        Ok(())
    }

    /// Activates a pending account
    pub async fn activate_account(&self, actor: &Account, user_name: &str) -> AdminResult<Account> {
        require_administrator(actor)?;
        check_user_name(user_name)?;

        let mut account = self
            .store
            .find_account_by_name(user_name)
            .await?
            .ok_or_else(|| AdminError::TargetNotFound(TargetRef::AccountName(user_name.to_string())))?;

        if account.state != AccountState::Pending {
            return Err(AdminError::InvalidArgument(format!(
                "account '{}' is already active",
                user_name
            )));
        }

        account.state = AccountState::Active;
        account.updated_at = chrono::Utc::now();
        if !self.store.save_account(&account).await? {
            return Err(AdminError::account_not_found(account.id));
        }

        tracing::info!(account_id = account.id, user_name, "Account activated");
        Ok(account)
    }

    /// Activates several accounts, reporting each name's outcome
    pub async fn batch_activate(&self, actor: &Account, user_names: &[String]) -> AdminResult<BatchActivation> {
        require_administrator(actor)?;

        let mut result = BatchActivation::default();
        for user_name in user_names {
            match self.activate_account(actor, user_name).await {
                Ok(_) => result.activated.push(user_name.clone()),
                Err(e) => result.failed.push((user_name.clone(), e.to_string())),
            }
        }

        tracing::info!(
            activated = result.activated.len(),
            failed = result.failed.len(),
            "Batch activation finished"
        );
        Ok(result)
    }

    async fn grant(
        &self,
        actor: &Account,
        account_id: i32,
        kind: GrantKind,
        raw_ids: &str,
    ) -> AdminResult<ReconcileOutcome> {
        require_administrator(actor)?;
        self.account(account_id).await?;

        let requested = parse_ids_for(kind, raw_ids)?;
        let usage = match kind {
            GrantKind::Resource => {
                UsageIndex::from_usages(self.store.list_definition_usages(account_id).await?)
            }
            _ => UsageIndex::empty(),
        };

        self.reconciler
            .reconcile_current(account_id, kind, &requested, &usage)
            .await
    }

    /// Replaces the account's resource grants
    ///
    /// `raw_ids` is a comma-separated list whose entries may be ancestor
    /// chains (`"1-4-9,12"`).
    pub async fn grant_resources(&self, actor: &Account, account_id: i32, raw_ids: &str) -> AdminResult<ReconcileOutcome> {
        self.grant(actor, account_id, GrantKind::Resource, raw_ids).await
    }

    /// Replaces the account's UDF function grants
    pub async fn grant_udf_functions(&self, actor: &Account, account_id: i32, raw_ids: &str) -> AdminResult<ReconcileOutcome> {
        self.grant(actor, account_id, GrantKind::UdfFunction, raw_ids).await
    }

    /// Replaces the account's data source grants
    pub async fn grant_data_sources(&self, actor: &Account, account_id: i32, raw_ids: &str) -> AdminResult<ReconcileOutcome> {
        self.grant(actor, account_id, GrantKind::DataSource, raw_ids).await
    }

    /// Replaces the account's project grants
    pub async fn grant_projects(&self, actor: &Account, account_id: i32, raw_ids: &str) -> AdminResult<ReconcileOutcome> {
        self.grant(actor, account_id, GrantKind::Project, raw_ids).await
    }

    /// Grants one project, identified by code, without touching other grants
    ///
    /// The project's creator receives `Owner`, anyone else `Writable`.
    pub async fn grant_project_by_code(
        &self,
        actor: &Account,
        account_id: i32,
        project_code: i64,
    ) -> AdminResult<NewGrant> {
        self.account(account_id).await?;
        let project = self.project(project_code).await?;
        require_project_creator(actor, project.owner_id, project_code)?;

        let grant = NewGrant {
            target_id: project.id,
            permission: if account_id == project.owner_id {
                Permission::owner()
            } else {
                Permission::writable()
            },
        };
        self.store
            .upsert_grant(account_id, GrantKind::Project, grant)
            .await?;

        tracing::info!(
            account_id,
            project_code,
            permission = ?grant.permission,
            actor = actor.id,
            "Project granted"
        );
        Ok(grant)
    }

    /// Revokes one project, identified by code
    ///
    /// # Returns
    ///
    /// False if the account held no grant on the project
    pub async fn revoke_project(&self, actor: &Account, account_id: i32, project_code: i64) -> AdminResult<bool> {
        require_administrator(actor)?;
        self.account(account_id).await?;
        let project = self.project(project_code).await?;

        let revoked = self
            .store
            .revoke_grant(account_id, GrantKind::Project, project.id)
            .await?;

        tracing::info!(account_id, project_code, revoked, actor = actor.id, "Project revoked");
        Ok(revoked)
    }

    /// Provisions the namespace of every tenant
    ///
    /// # Returns
    ///
    /// Number of tenants whose namespace had to be created
    pub async fn provision_tenant_namespaces(&self) -> AdminResult<usize> {
        let mut provisioned = 0;
        for tenant in self.store.list_tenants().await? {
            if self
                .provisioner()
                .ensure_tenant_namespace(&tenant.tenant_code)
                .await?
            {
                provisioned += 1;
            }
        }
        Ok(provisioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_user_name() {
        assert!(check_user_name("j.doe-01_x").is_ok());
        assert!(check_user_name("jd").is_err());
        assert!(check_user_name("j doe").is_err());
        assert!(check_user_name("jdoé").is_err());
    }

    #[test]
    fn test_check_phone() {
        assert!(check_phone("+1 555-0100").is_ok());
        assert!(check_phone("5550100").is_ok());
        assert!(check_phone("+").is_err());
        assert!(check_phone("call me").is_err());
    }

    #[test]
    fn test_new_account_validation() {
        let request = NewAccount {
            user_name: "jdoe".to_string(),
            password: "short".to_string(),
            email: "not-an-email".to_string(),
            phone: None,
            tenant_id: 1,
            queue: String::new(),
        };

        let errors = request.validate().unwrap_err();
        let fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        assert!(fields.contains(&"password".to_string()));
        assert!(fields.contains(&"email".to_string()));
        assert!(!fields.contains(&"user_name".to_string()));
    }

    #[test]
    fn test_weak_password_rejected() {
        assert!(matches!(
            check_password("alllowercase1!"),
            Err(AdminError::InvalidArgument(_))
        ));
        assert!(check_password("Str0ng!pass").is_ok());
    }
}
