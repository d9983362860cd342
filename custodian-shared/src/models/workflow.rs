/// Workflow definition usage of resources
///
/// Released workflow definitions reference resources by ID. While such a
/// reference exists the resource's grant must not be revoked, so the grant
/// reconciler reads these rows before removing anything. Nothing here is
/// ever written by account administration.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE workflow_definitions (
///     code BIGINT PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     owner_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     released BOOLEAN NOT NULL DEFAULT FALSE
/// );
///
/// CREATE TABLE workflow_definition_resources (
///     definition_code BIGINT NOT NULL REFERENCES workflow_definitions(code) ON DELETE CASCADE,
///     resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
///     PRIMARY KEY (definition_code, resource_id)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// One (resource, released definition) reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DefinitionUsage {
    /// Referenced resource
    pub resource_id: i32,

    /// Code of the released workflow definition referencing it
    pub definition_code: i64,
}

impl DefinitionUsage {
    /// Lists resource references of the released definitions owned by an account
    pub async fn list_released_by_owner(
        pool: &PgPool,
        owner_id: i32,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DefinitionUsage>(
            r#"
            SELECT r.resource_id, r.definition_code
            FROM workflow_definition_resources r
            JOIN workflow_definitions d ON d.code = r.definition_code
            WHERE d.owner_id = $1 AND d.released
            ORDER BY r.resource_id, r.definition_code
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }
}
