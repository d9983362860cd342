//! # Custodian Admin
//!
//! Prepares the account administration backend: connects to PostgreSQL,
//! applies migrations and, when resource upload is enabled, provisions the
//! storage namespace of every tenant.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/custodian cargo run -p custodian-admin
//! ```

use custodian_admin::accounts::AccountService;
use custodian_admin::config::Config;
use custodian_admin::store::PgAccountStore;
use custodian_shared::db::migrations::run_migrations;
use custodian_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use custodian_shared::storage::LocalStorage;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "custodian_admin=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Custodian Admin v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::from_url(&config.database.url)
    })
    .await?;
    run_migrations(&pool).await?;

    let storage = Arc::new(LocalStorage::new(&config.storage.root));
    let service = AccountService::new(
        Arc::new(PgAccountStore::new(pool.clone())),
        storage,
        config.storage.layout(),
        config.service,
    );

    if config.service.resource_upload_enabled {
        let provisioned = service.provision_tenant_namespaces().await?;
        tracing::info!(
            provisioned,
            root = %config.storage.root.display(),
            base_path = %config.storage.base_path,
            "Tenant namespaces ready"
        );
    } else {
        tracing::info!("Resource upload disabled, skipping namespace provisioning");
    }

    close_pool(pool).await;
    tracing::info!("Custodian Admin ready");

    Ok(())
}
