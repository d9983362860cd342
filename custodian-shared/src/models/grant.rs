/// Grant model and database operations
///
/// A grant is an authorization edge from an account to a target of one kind
/// (project, resource, UDF function or data source) with a permission level.
/// Grants of one account and kind form a set that is replaced wholesale when
/// re-granted.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE grant_kind AS ENUM ('project', 'resource', 'udf_function', 'data_source');
/// CREATE TYPE grant_permission AS ENUM ('readable', 'writable', 'owner');
///
/// CREATE TABLE grants (
///     account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     kind grant_kind NOT NULL,
///     target_id INTEGER NOT NULL,
///     permission grant_permission NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (account_id, kind, target_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use custodian_shared::models::grant::{Grant, GrantKind, NewGrant, Permission};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let grants = vec![
///     NewGrant { target_id: 5, permission: Permission::writable() },
///     NewGrant { target_id: 7, permission: Permission::readable() },
/// ];
/// Grant::replace_all(&pool, 42, GrantKind::Resource, &grants).await?;
///
/// let ids = Grant::list_target_ids(&pool, 42, GrantKind::Resource).await?;
/// assert_eq!(ids.len(), 2);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Kind of grant target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grant_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Project
    Project,

    /// File or UDF resource
    Resource,

    /// UDF function definition
    UdfFunction,

    /// Data source
    DataSource,
}

impl GrantKind {
    /// Converts kind to string for display and logging
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::Project => "project",
            GrantKind::Resource => "resource",
            GrantKind::UdfFunction => "udf_function",
            GrantKind::DataSource => "data_source",
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission level carried by a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grant_permission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// May read the target (directories)
    Readable,

    /// May read and modify the target
    Writable,

    /// Creator-level access
    Owner,
}

impl Permission {
    /// Read-only access
    pub fn readable() -> Self {
        Permission::Readable
    }

    /// Read/write access
    pub fn writable() -> Self {
        Permission::Writable
    }

    /// Creator-level access
    pub fn owner() -> Self {
        Permission::Owner
    }

    /// Permission policy for a grant target: directories are readable,
    /// everything else writable
    pub fn for_target(is_directory: bool) -> Self {
        if is_directory {
            Permission::readable()
        } else {
            Permission::writable()
        }
    }
}

/// Grant record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Grant {
    /// Grantee
    pub account_id: i32,

    /// Target kind
    pub kind: GrantKind,

    /// Target ID within its kind
    pub target_id: i32,

    /// Permission level
    pub permission: Permission,

    /// When the grant was created
    pub created_at: DateTime<Utc>,

    /// When the grant was last updated
    pub updated_at: DateTime<Utc>,
}

/// Grant to insert for an account and kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrant {
    /// Target ID
    pub target_id: i32,

    /// Permission level
    pub permission: Permission,
}

/// Resolved grant target
///
/// Only resources can be directories; every other kind reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantTarget {
    /// Target ID
    pub id: i32,

    /// Whether the target is a directory resource
    pub is_directory: bool,
}

impl Grant {
    /// Lists the target IDs of one kind granted to an account
    pub async fn list_target_ids(
        pool: &PgPool,
        account_id: i32,
        kind: GrantKind,
    ) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT target_id
            FROM grants
            WHERE account_id = $1 AND kind = $2
            ORDER BY target_id
            "#,
        )
        .bind(account_id)
        .bind(kind)
        .fetch_all(pool)
        .await
    }

    /// Replaces every grant of `kind` held by `account_id` with `grants`
    ///
    /// Runs in a single transaction: either the whole set is replaced or the
    /// previous set stays.
    pub async fn replace_all(
        pool: &PgPool,
        account_id: i32,
        kind: GrantKind,
        grants: &[NewGrant],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM grants WHERE account_id = $1 AND kind = $2")
            .bind(account_id)
            .bind(kind)
            .execute(&mut *tx)
            .await?;

        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO grants (account_id, kind, target_id, permission)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(account_id)
            .bind(kind)
            .bind(grant.target_id)
            .bind(grant.permission)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Inserts or refreshes a single grant
    pub async fn upsert(
        pool: &PgPool,
        account_id: i32,
        kind: GrantKind,
        grant: NewGrant,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO grants (account_id, kind, target_id, permission)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_id, kind, target_id)
            DO UPDATE SET permission = EXCLUDED.permission, updated_at = NOW()
            "#,
        )
        .bind(account_id)
        .bind(kind)
        .bind(grant.target_id)
        .bind(grant.permission)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Deletes a single grant
    ///
    /// # Returns
    ///
    /// True if the grant existed
    pub async fn delete(
        pool: &PgPool,
        account_id: i32,
        kind: GrantKind,
        target_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM grants WHERE account_id = $1 AND kind = $2 AND target_id = $3",
        )
        .bind(account_id)
        .bind(kind)
        .bind(target_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl GrantTarget {
    /// Resolves a grant target by kind and ID
    ///
    /// # Returns
    ///
    /// None if no row of that kind has the ID
    pub async fn find(pool: &PgPool, kind: GrantKind, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let query = match kind {
            GrantKind::Resource => "SELECT id, is_directory FROM resources WHERE id = $1",
            GrantKind::Project => "SELECT id, FALSE AS is_directory FROM projects WHERE id = $1",
            GrantKind::UdfFunction => "SELECT id, FALSE AS is_directory FROM udf_functions WHERE id = $1",
            GrantKind::DataSource => "SELECT id, FALSE AS is_directory FROM data_sources WHERE id = $1",
        };

        let row: Option<(i32, bool)> = sqlx::query_as(query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|(id, is_directory)| GrantTarget { id, is_directory }))
    }
}
