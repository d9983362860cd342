/// Role checks for account administration
///
/// Every administrative operation is performed on behalf of an acting
/// account. These helpers decide whether that actor may touch a given
/// account or project.
///
/// # Permission Model
///
/// 1. **Administrator**: may manage every account and grant
/// 2. **Self**: a general account may update its own record
/// 3. **Creator**: a project's creator may grant access to it
///
/// # Example
///
/// ```
/// use custodian_shared::auth::authorization::{require_administrator, AuthzError};
/// # use custodian_shared::models::account::Account;
///
/// fn delete_allowed(actor: &Account) -> Result<(), AuthzError> {
///     require_administrator(actor)
/// }
/// ```

use crate::models::account::Account;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor is not an administrator
    #[error("Account {0} is not an administrator")]
    NotAdministrator(i32),

    /// Actor may not act on the target account or project
    #[error("Account {actor} may not manage {target}")]
    NotAuthorized { actor: i32, target: String },
}

/// Requires the actor to be an administrator
pub fn require_administrator(actor: &Account) -> Result<(), AuthzError> {
    if actor.is_administrator() {
        Ok(())
    } else {
        Err(AuthzError::NotAdministrator(actor.id))
    }
}

/// Requires the actor to be the target account itself or an administrator
pub fn require_self_or_administrator(actor: &Account, account_id: i32) -> Result<(), AuthzError> {
    if actor.id == account_id || actor.is_administrator() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized {
            actor: actor.id,
            target: format!("account {}", account_id),
        })
    }
}

/// Requires the actor to have created the project or be an administrator
pub fn require_project_creator(
    actor: &Account,
    project_owner_id: i32,
    project_code: i64,
) -> Result<(), AuthzError> {
    if actor.id == project_owner_id || actor.is_administrator() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized {
            actor: actor.id,
            target: format!("project {}", project_code),
        })
    }
}
