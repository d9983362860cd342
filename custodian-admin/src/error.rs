/// Error taxonomy of account administration
///
/// Every operation returns one [`AdminError`] on failure, carrying the IDs or
/// paths involved. Lower layers convert in through `#[from]`:
///
/// ```text
/// StorageError  ──> AdminError::StorageUnavailable
/// AuthzError    ──> AdminError::PermissionDenied
/// StoreError    ──> AdminError::Store
/// PasswordError ──> AdminError::Credential
/// ```

use crate::store::StoreError;
use custodian_shared::auth::authorization::AuthzError;
use custodian_shared::auth::password::PasswordError;
use custodian_shared::models::grant::GrantKind;
use custodian_shared::storage::StorageError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Entity an operation could not find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// Account by ID
    Account(i32),

    /// Account by user name
    AccountName(String),

    /// Tenant by ID
    Tenant(i32),

    /// Project by code
    Project(i64),

    /// Grant target of some kind
    Target { kind: GrantKind, id: i32 },
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Account(id) => write!(f, "account {}", id),
            TargetRef::AccountName(name) => write!(f, "account '{}'", name),
            TargetRef::Tenant(id) => write!(f, "tenant {}", id),
            TargetRef::Project(code) => write!(f, "project {}", code),
            TargetRef::Target { kind, id } => write!(f, "{} {}", kind, id),
        }
    }
}

/// Account administration error types
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    TargetNotFound(TargetRef),

    /// Revocation blocked by released workflow definitions
    #[error("Targets {ids:?} are used by released workflow definitions {definitions:?}")]
    TargetInUse {
        /// Blocked target IDs, ascending
        ids: Vec<i32>,

        /// Referencing definition codes per blocked target
        definitions: BTreeMap<i32, BTreeSet<i64>>,
    },

    /// Resource metadata points at a path absent from storage
    #[error("Resource missing from storage: {0}")]
    ResourceMissing(String),

    /// Storage call failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Actor lacks the required role
    #[error("Permission denied: {0}")]
    PermissionDenied(#[from] AuthzError),

    /// Request failed validation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// User name already taken
    #[error("User name already taken: {0}")]
    NameTaken(String),

    /// Account still owns projects
    #[error("Account owns projects: {0:?}")]
    OwnsProjects(Vec<String>),

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Credential hashing failure
    #[error("Credential error: {0}")]
    Credential(#[from] PasswordError),
}

impl AdminError {
    /// Shorthand for a missing account
    pub fn account_not_found(id: i32) -> Self {
        AdminError::TargetNotFound(TargetRef::Account(id))
    }

    /// Shorthand for a missing tenant
    pub fn tenant_not_found(id: i32) -> Self {
        AdminError::TargetNotFound(TargetRef::Tenant(id))
    }
}

impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AdminError::InvalidArgument(errors.to_string())
    }
}

/// Admin result type alias
pub type AdminResult<T> = Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_ref_display() {
        assert_eq!(TargetRef::Tenant(3).to_string(), "tenant 3");
        assert_eq!(
            TargetRef::Target {
                kind: GrantKind::DataSource,
                id: 9
            }
            .to_string(),
            "data_source 9"
        );
        assert_eq!(
            AdminError::account_not_found(4).to_string(),
            "Not found: account 4"
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: AdminError = StorageError::Unavailable("/x".to_string()).into();
        assert!(matches!(err, AdminError::StorageUnavailable(_)));

        let err: AdminError = AuthzError::NotAdministrator(2).into();
        assert!(matches!(err, AdminError::PermissionDenied(_)));
    }
}
