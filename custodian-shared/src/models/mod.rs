/// Database models for Custodian
///
/// Each model carries its own queries as associated functions taking a
/// `&PgPool`.
///
/// # Models
///
/// - `account`: Accounts, their role and activation state
/// - `tenant`: Tenants and their storage namespace codes
/// - `resource`: Hierarchical file and UDF resources
/// - `grant`: Authorization edges and permission levels
/// - `project`: Read-only project lookups
/// - `workflow`: Released workflow definition references to resources
///
/// # Example
///
/// ```no_run
/// use custodian_shared::models::resource::{Resource, ResourceKind};
/// use custodian_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/custodian")).await?;
/// let files = Resource::list_by_owner(&pool, 42, ResourceKind::File).await?;
/// println!("{} file resources", files.len());
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod grant;
pub mod project;
pub mod resource;
pub mod tenant;
pub mod workflow;
