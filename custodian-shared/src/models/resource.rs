/// Resource model and database operations
///
/// Resources are entries of a per-owner hierarchical namespace: uploaded
/// files and UDF jars, plus the directories that hold them. `full_name` is the
/// slash-delimited path from the category root, so a child's full name always
/// starts with its parent's.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE resource_kind AS ENUM ('file', 'udf');
///
/// CREATE TABLE resources (
///     id SERIAL PRIMARY KEY,
///     pid INTEGER REFERENCES resources(id) ON DELETE CASCADE,
///     full_name TEXT NOT NULL,
///     is_directory BOOLEAN NOT NULL DEFAULT FALSE,
///     kind resource_kind NOT NULL,
///     owner_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     size BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (owner_id, kind, full_name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Resource category
///
/// Each category lives under its own directory of the tenant namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Plain uploaded files
    File,

    /// UDF jars
    Udf,
}

impl ResourceKind {
    /// Every category, in migration order
    pub const ALL: [ResourceKind; 2] = [ResourceKind::File, ResourceKind::Udf];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::File => write!(f, "file"),
            ResourceKind::Udf => write!(f, "udf"),
        }
    }
}

/// Resource record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Resource {
    /// Resource ID
    pub id: i32,

    /// Parent directory ID (None for top-level entries)
    pub pid: Option<i32>,

    /// Slash-delimited path from the category root, e.g. `/sub/b.txt`
    pub full_name: String,

    /// Whether this entry is a directory
    pub is_directory: bool,

    /// Category
    pub kind: ResourceKind,

    /// Owning account
    pub owner_id: i32,

    /// Size in bytes (0 for directories)
    pub size: i64,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// When the resource was last updated
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Lists the resources of one category owned by an account
    ///
    /// Ordered by ID, which is creation order, so parents precede children.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: i32,
        kind: ResourceKind,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, pid, full_name, is_directory, kind, owner_id, size, created_at, updated_at
            FROM resources
            WHERE owner_id = $1 AND kind = $2
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .bind(kind)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(ResourceKind::File.to_string(), "file");
        assert_eq!(ResourceKind::Udf.to_string(), "udf");
    }

    #[test]
    fn test_resource_kind_all_order() {
        assert_eq!(ResourceKind::ALL, [ResourceKind::File, ResourceKind::Udf]);
    }
}
