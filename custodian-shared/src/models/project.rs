/// Project lookups used by account administration
///
/// Projects are managed elsewhere; this module only reads them to resolve
/// grants by project code and to stop an account that still owns projects
/// from being deleted.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Project record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Project ID
    pub id: i32,

    /// Stable project code
    pub code: i64,

    /// Display name
    pub name: String,

    /// Creating account
    pub owner_id: i32,
}

impl Project {
    /// Finds a project by its code
    pub async fn find_by_code(pool: &PgPool, code: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            "SELECT id, code, name, owner_id FROM projects WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(pool)
        .await
    }

    /// Lists the projects created by an account
    pub async fn list_created_by(pool: &PgPool, owner_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            "SELECT id, code, name, owner_id FROM projects WHERE owner_id = $1 ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }
}
