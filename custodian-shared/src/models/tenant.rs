/// Tenant model and database operations
///
/// A tenant is the storage namespace its accounts' files live under. The
/// `tenant_code` maps 1:1 to a directory prefix in the storage capability
/// (see [`crate::storage::StorageLayout`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tenants (
///     id SERIAL PRIMARY KEY,
///     tenant_code VARCHAR(64) NOT NULL UNIQUE,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use custodian_shared::models::tenant::{Tenant, CreateTenant};
/// use custodian_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/custodian")).await?;
///
/// let tenant = Tenant::create(&pool, CreateTenant {
///     tenant_code: "analytics".to_string(),
///     description: None,
/// }).await?;
/// println!("Created tenant: {}", tenant.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Tenant record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    /// Tenant ID
    pub id: i32,

    /// Storage namespace code
    pub tenant_code: String,

    /// Free-form description
    pub description: Option<String>,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,

    /// When the tenant was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    /// Storage namespace code
    pub tenant_code: String,

    /// Free-form description
    pub description: Option<String>,
}

impl Tenant {
    /// Creates a new tenant
    ///
    /// # Errors
    ///
    /// Returns an error if the code is already taken or the database fails
    pub async fn create(pool: &PgPool, data: CreateTenant) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (tenant_code, description)
            VALUES ($1, $2)
            RETURNING id, tenant_code, description, created_at, updated_at
            "#,
        )
        .bind(data.tenant_code)
        .bind(data.description)
        .fetch_one(pool)
        .await
    }

    /// Finds a tenant by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, tenant_code, description, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists every tenant ordered by ID
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, tenant_code, description, created_at, updated_at
            FROM tenants
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tenant_deserialize() {
        let json = r#"{"tenant_code":"analytics","description":null}"#;
        let data: CreateTenant = serde_json::from_str(json).unwrap();
        assert_eq!(data.tenant_code, "analytics");
        assert!(data.description.is_none());
    }
}
