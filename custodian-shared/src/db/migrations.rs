/// Database migration runner
///
/// Migrations are embedded from `custodian-shared/migrations/` at compile time
/// and applied with sqlx's migrator.

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Applies all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails to apply or the database is lost
/// while migrating.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database migrations completed");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Creates the database if it doesn't exist
///
/// Development and test helper; production databases are provisioned ahead
/// of time.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("Database already exists");
    }

    Ok(())
}
