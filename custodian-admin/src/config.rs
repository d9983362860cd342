/// Configuration management for the account administration service
///
/// Loads configuration from environment variables (and a `.env` file when
/// present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `STORAGE_ROOT`: Local directory backing the storage tree (default: ./data)
/// - `STORAGE_BASE_PATH`: Storage path holding tenant namespaces (default: /custodian)
/// - `RESOURCE_UPLOAD_ENABLED`: Whether accounts have stored files (default: false)
/// - `DEFAULT_TENANT_ID`: Tenant of self-registered accounts (default: 1)
/// - `RUST_LOG`: Log filter (default: custodian_admin=debug)
///
/// # Example
///
/// ```no_run
/// use custodian_admin::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Tenants live under {}", config.storage.base_path);
/// # Ok(())
/// # }
/// ```

use custodian_shared::storage::StorageLayout;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Behaviour switches of the account flows
    pub service: ServiceSettings,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Local directory the storage tree is mapped onto
    pub root: PathBuf,

    /// Storage path under which tenant namespaces live
    pub base_path: String,
}

impl StorageConfig {
    /// Namespace layout rooted at `base_path`
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(self.base_path.clone())
    }
}

/// Switches consumed by the account flows and the migrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Accounts have files in storage that follow them between tenants
    pub resource_upload_enabled: bool,

    /// Tenant assigned to self-registered accounts
    pub default_tenant_id: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            resource_upload_enabled: false,
            default_tenant_id: 1,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing
    /// - A variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds configuration from a variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let storage_root = var("STORAGE_ROOT").unwrap_or_else(|| "./data".to_string());
        let base_path = var("STORAGE_BASE_PATH").unwrap_or_else(|| "/custodian".to_string());

        if !base_path.starts_with('/') {
            anyhow::bail!("STORAGE_BASE_PATH must be absolute, got '{}'", base_path);
        }

        let resource_upload_enabled = var("RESOURCE_UPLOAD_ENABLED")
            .unwrap_or_else(|| "false".to_string())
            .parse::<bool>()?;

        let default_tenant_id = var("DEFAULT_TENANT_ID")
            .unwrap_or_else(|| "1".to_string())
            .parse::<i32>()?;

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            storage: StorageConfig {
                root: PathBuf::from(storage_root),
                base_path,
            },
            service: ServiceSettings {
                resource_upload_enabled,
                default_tenant_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/test")]).unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.storage.root, PathBuf::from("./data"));
        assert_eq!(config.storage.layout().base_path(), "/custodian");
        assert_eq!(config.service, ServiceSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("RESOURCE_UPLOAD_ENABLED", "true"),
            ("DEFAULT_TENANT_ID", "4"),
            ("STORAGE_BASE_PATH", "/dolphin/"),
        ])
        .unwrap();

        assert!(config.service.resource_upload_enabled);
        assert_eq!(config.service.default_tenant_id, 4);
        assert_eq!(config.storage.layout().tenant_dir("acme"), "/dolphin/acme");
    }

    #[test]
    fn test_missing_database_url() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_relative_base_path_rejected() {
        let result = load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("STORAGE_BASE_PATH", "custodian"),
        ]);
        assert!(result.is_err());
    }
}
