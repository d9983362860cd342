/// Tree replicator
///
/// Copies a resource forest from one storage base path to another, strictly
/// depth-first with one storage call in flight at a time. For every node:
///
/// ```text
/// source missing              -> ResourceMissing(full_name), stop
/// file                        -> copy (overwrite, preserve metadata)
/// directory without children  -> mkdir if destination absent
/// directory with children     -> recurse with the same base paths
/// ```
///
/// Full names are relative to the base paths, so recursion never rebases.
/// A failure leaves the destination partially written; nothing already
/// copied is undone. Replicating the same forest twice gives the same
/// destination content.
///
/// # Example
///
/// ```no_run
/// use custodian_admin::replicator::Replicator;
/// use custodian_admin::tree::build_forest;
/// use custodian_shared::storage::{LocalStorage, Storage};
/// use std::sync::Arc;
///
/// # async fn example(resources: Vec<custodian_shared::models::resource::Resource>)
/// #     -> Result<(), Box<dyn std::error::Error>> {
/// let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new("/var/lib/custodian"));
/// let replicator = Replicator::new(storage);
///
/// let report = replicator
///     .replicate(&build_forest(resources), "/custodian/t1/resources", "/custodian/t2/resources")
///     .await?;
/// println!("copied {} files", report.files_copied);
/// # Ok(())
/// # }
/// ```

use crate::error::{AdminError, AdminResult};
use crate::tree::ResourceNode;
use custodian_shared::storage::{join_path, Storage, StorageError};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

/// Counters of one replication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Files copied
    pub files_copied: usize,

    /// Leaf directories created
    pub directories_created: usize,

    /// Leaf directories already present at the destination
    pub directories_existing: usize,
}

/// Depth-first forest copier over a [`Storage`]
#[derive(Clone)]
pub struct Replicator {
    storage: Arc<dyn Storage>,
}

impl Replicator {
    /// Creates a replicator over `storage`
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Replicator { storage }
    }

    /// Replicates `forest` from `source_base` to `dest_base`
    ///
    /// # Errors
    ///
    /// - `ResourceMissing` with the node's full name when its source is absent
    /// - `InvalidArgument` when a full name is not a valid path, or a file
    ///   sits where a directory has to go
    /// - `StorageUnavailable` when a storage call fails
    pub async fn replicate(
        &self,
        forest: &[ResourceNode],
        source_base: &str,
        dest_base: &str,
    ) -> AdminResult<ReplicationReport> {
        let mut report = ReplicationReport::default();
        self.replicate_nodes(forest, source_base, dest_base, &mut report)
            .await?;

        tracing::debug!(
            backend = self.storage.name(),
            source = source_base,
            destination = dest_base,
            files = report.files_copied,
            directories = report.directories_created,
            "Replicated resource tree"
        );

        Ok(report)
    }

    fn replicate_nodes<'a>(
        &'a self,
        nodes: &'a [ResourceNode],
        source_base: &'a str,
        dest_base: &'a str,
        report: &'a mut ReplicationReport,
    ) -> BoxFuture<'a, AdminResult<()>> {
        async move {
            for node in nodes {
                let full_name = &node.resource.full_name;
                let src = join_path(source_base, full_name);
                let dst = join_path(dest_base, full_name);
                let fail = |e: StorageError| node_error(full_name, e);

                if !self.storage.exists(&src).await.map_err(fail)? {
                    tracing::error!(
                        resource_id = node.resource.id,
                        path = %src,
                        "Resource missing from storage"
                    );
                    return Err(AdminError::ResourceMissing(full_name.clone()));
                }

                if !node.resource.is_directory {
                    self.storage
                        .copy(&src, &dst, true, true)
                        .await
                        .map_err(fail)?;
                    report.files_copied += 1;
                    tracing::debug!(src = %src, dst = %dst, "Copied file");
                } else if node.children.is_empty() {
                    if self.storage.exists(&dst).await.map_err(fail)? {
                        // mkdir is a no-op on a directory and rejects a file
                        self.storage.mkdir(&dst).await.map_err(fail)?;
                        report.directories_existing += 1;
                    } else {
                        self.storage.mkdir(&dst).await.map_err(fail)?;
                        report.directories_created += 1;
                        tracing::debug!(dst = %dst, "Created directory");
                    }
                } else {
                    self.replicate_nodes(&node.children, source_base, dest_base, report)
                        .await?;
                }
            }

            Ok(())
        }
        .boxed()
    }
}

/// Classifies a storage failure while replicating `full_name`
fn node_error(full_name: &str, error: StorageError) -> AdminError {
    match error {
        StorageError::NotFound(_) => AdminError::ResourceMissing(full_name.to_string()),
        StorageError::InvalidPath(path) => {
            AdminError::InvalidArgument(format!("invalid resource path '{}'", path))
        }
        StorageError::AlreadyExists(path) => AdminError::InvalidArgument(format!(
            "destination of '{}' conflicts with existing file '{}'",
            full_name, path
        )),
        other => AdminError::StorageUnavailable(other),
    }
}
