//! # Custodian Shared Library
//!
//! Types and infrastructure shared by the Custodian account administration
//! service: persistence models, the storage capability and credential helpers.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `db`: Connection pool and embedded migrations
//! - `auth`: Credential hashing and role checks
//! - `storage`: Hierarchical storage capability (trait, layout, backends)

pub mod auth;
pub mod db;
pub mod models;
pub mod storage;

/// Current version of the Custodian shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
