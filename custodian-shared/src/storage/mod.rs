/// Hierarchical storage capability
///
/// Account files live in a remote hierarchical store (HDFS, an object store
/// with directory semantics, or a plain filesystem). Account administration
/// only needs four operations from it, captured by the [`Storage`] trait.
///
/// # Backends
///
/// - [`LocalStorage`]: maps storage paths onto a local directory via `tokio::fs`
/// - [`MemoryStorage`]: in-process tree with an operation log, for tests
///
/// # Paths
///
/// Storage paths are absolute, slash-delimited strings (`/custodian/acme/resources/a.txt`).
/// Empty segments are ignored; `.` and `..` segments are rejected.
///
/// # Example
///
/// ```no_run
/// use custodian_shared::storage::{LocalStorage, Storage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = LocalStorage::new("/var/lib/custodian");
///
/// storage.mkdir("/custodian/acme/resources").await?;
/// if storage.exists("/custodian/acme/resources/a.txt").await? {
///     storage
///         .copy("/custodian/acme/resources/a.txt", "/custodian/beta/resources/a.txt", true, true)
///         .await?;
/// }
/// # Ok(())
/// # }
/// ```

mod layout;
mod local;
mod memory;

pub use layout::StorageLayout;
pub use local::LocalStorage;
pub use memory::{MemoryStorage, StorageOp};

use async_trait::async_trait;

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Path does not exist
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Destination exists and overwriting was not allowed
    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// Non-recursive delete of a directory with children
    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    /// Path is malformed
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    /// Underlying I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage capability consumed by account administration
///
/// Calls may block on network I/O; callers await them one at a time.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the backend name, used in logs
    fn name(&self) -> &str;

    /// Whether a file or directory exists at `path`
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Creates `path` and any missing ancestors as directories
    ///
    /// Succeeds if the directory already exists.
    async fn mkdir(&self, path: &str) -> StorageResult<()>;

    /// Copies a file or directory tree from `src` to `dst`
    ///
    /// Missing ancestors of `dst` are created. With `overwrite = false` an
    /// existing destination file is an error. With `preserve_metadata` the
    /// backend keeps what it can of the source's metadata.
    async fn copy(
        &self,
        src: &str,
        dst: &str,
        overwrite: bool,
        preserve_metadata: bool,
    ) -> StorageResult<()>;

    /// Deletes the entry at `path`
    ///
    /// # Returns
    ///
    /// False if nothing existed at `path`
    async fn delete(&self, path: &str, recursive: bool) -> StorageResult<bool>;
}

/// Joins a base directory and a path relative to it
///
/// `name` may carry a leading slash (resource full names do); it is treated
/// as relative to `base` either way.
///
/// ```
/// use custodian_shared::storage::join_path;
///
/// assert_eq!(join_path("/t1/resources", "/sub/b.txt"), "/t1/resources/sub/b.txt");
/// assert_eq!(join_path("/t1/resources/", "a.txt"), "/t1/resources/a.txt");
/// ```
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');

    if name.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Splits a storage path into its segments
pub(crate) fn segments(path: &str) -> StorageResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if parts.iter().any(|s| *s == "." || *s == "..") {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    Ok(parts)
}
