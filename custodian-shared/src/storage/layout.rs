/// Storage namespace layout
///
/// ```text
/// {base}/{tenant_code}                     tenant namespace
/// {base}/{tenant_code}/resources           file resources
/// {base}/{tenant_code}/udfs                UDF resources
/// {base}/{tenant_code}/home/{account_id}   account home
/// ```

use super::join_path;
use crate::models::resource::ResourceKind;

/// Maps tenants, categories and accounts onto storage paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    base_path: String,
}

impl StorageLayout {
    /// Creates a layout rooted at `base_path`
    pub fn new(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        let trimmed = base_path.trim_end_matches('/');

        StorageLayout {
            base_path: if trimmed.is_empty() {
                String::new()
            } else {
                trimmed.to_string()
            },
        }
    }

    /// Root of every tenant namespace
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Namespace directory of a tenant
    pub fn tenant_dir(&self, tenant_code: &str) -> String {
        join_path(&self.base_path, tenant_code)
    }

    /// Directory holding a tenant's file resources
    pub fn resource_dir(&self, tenant_code: &str) -> String {
        join_path(&self.tenant_dir(tenant_code), "resources")
    }

    /// Directory holding a tenant's UDF resources
    pub fn udf_dir(&self, tenant_code: &str) -> String {
        join_path(&self.tenant_dir(tenant_code), "udfs")
    }

    /// Base directory of a resource category
    pub fn category_dir(&self, tenant_code: &str, kind: ResourceKind) -> String {
        match kind {
            ResourceKind::File => self.resource_dir(tenant_code),
            ResourceKind::Udf => self.udf_dir(tenant_code),
        }
    }

    /// Home directory of an account inside a tenant namespace
    pub fn home_dir(&self, tenant_code: &str, account_id: i32) -> String {
        join_path(
            &self.tenant_dir(tenant_code),
            &format!("home/{}", account_id),
        )
    }
}
