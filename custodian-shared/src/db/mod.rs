/// Database layer for Custodian
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded schema migrations
///
/// Models live in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use custodian_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_url(std::env::var("DATABASE_URL")?);
///     let pool = create_pool(config).await?;
///     custodian_shared::db::migrations::run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
