//! # Custodian Admin
//!
//! Account administration for a multi-tenant workflow platform: account
//! lifecycle, grant reconciliation, and moving an account's stored files
//! when its tenant changes.
//!
//! ## Modules
//!
//! - `accounts`: Account and grant entry points
//! - `reconciler`: Grant set replacement with the workflow usage gate
//! - `migration`: Tenant switch storage migration
//! - `namespace`: Tenant namespace and home directory provisioning
//! - `replicator`: Depth-first resource tree copy
//! - `tree`: Flat resource records to a forest
//! - `store`: Metadata store seam (PostgreSQL and in-memory)
//! - `config`: Environment configuration
//! - `error`: Error taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use custodian_admin::reconciler::parse_target_ids;
//!
//! let ids = parse_target_ids("1-4-9,12").unwrap();
//! assert_eq!(ids, vec![1, 4, 9, 12]);
//! ```

pub mod accounts;
pub mod config;
pub mod error;
pub mod migration;
pub mod namespace;
pub mod reconciler;
pub mod replicator;
pub mod store;
pub mod tree;

pub use error::{AdminError, AdminResult};
