/// Local filesystem storage backend
///
/// Storage paths are resolved below a root directory, so `/custodian/acme`
/// with root `/var/lib/custodian` lands on `/var/lib/custodian/custodian/acme`.

use super::{segments, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// [`Storage`] implementation over `tokio::fs`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl LocalStorage {
    /// Creates a backend rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStorage { root: root.into() }
    }

    /// Root directory on the local filesystem
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in segments(path)? {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    async fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        overwrite: bool,
        preserve_metadata: bool,
    ) -> StorageResult<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        if !overwrite && fs::try_exists(dst).await.map_err(|e| io_error(dst, e))? {
            return Err(StorageError::AlreadyExists(dst.display().to_string()));
        }

        fs::copy(src, dst).await.map_err(|e| io_error(src, e))?;

        if preserve_metadata {
            let metadata = fs::metadata(src).await.map_err(|e| io_error(src, e))?;
            fs::set_permissions(dst, metadata.permissions())
                .await
                .map_err(|e| io_error(dst, e))?;
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let resolved = self.resolve(path)?;
        fs::try_exists(&resolved)
            .await
            .map_err(|e| io_error(&resolved, e))
    }

    async fn mkdir(&self, path: &str) -> StorageResult<()> {
        let resolved = self.resolve(path)?;

        match fs::metadata(&resolved).await {
            Ok(metadata) if metadata.is_dir() => return Ok(()),
            Ok(_) => return Err(StorageError::AlreadyExists(path.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&resolved, e)),
        }

        fs::create_dir_all(&resolved)
            .await
            .map_err(|e| io_error(&resolved, e))
    }

    async fn copy(
        &self,
        src: &str,
        dst: &str,
        overwrite: bool,
        preserve_metadata: bool,
    ) -> StorageResult<()> {
        let src_path = self.resolve(src)?;
        let dst_path = self.resolve(dst)?;

        let metadata = match fs::metadata(&src_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(src.to_string()))
            }
            Err(e) => return Err(io_error(&src_path, e)),
        };

        if !metadata.is_dir() {
            return self
                .copy_file(&src_path, &dst_path, overwrite, preserve_metadata)
                .await;
        }

        let mut pending = vec![(src_path, dst_path)];
        while let Some((from, to)) = pending.pop() {
            fs::create_dir_all(&to).await.map_err(|e| io_error(&to, e))?;

            let mut entries = fs::read_dir(&from).await.map_err(|e| io_error(&from, e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&from, e))? {
                let child_from = entry.path();
                let child_to = to.join(entry.file_name());
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| io_error(&child_from, e))?;

                if file_type.is_dir() {
                    pending.push((child_from, child_to));
                } else {
                    self.copy_file(&child_from, &child_to, overwrite, preserve_metadata)
                        .await?;
                }
            }
        }

        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> StorageResult<bool> {
        let resolved = self.resolve(path)?;

        let metadata = match fs::metadata(&resolved).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(io_error(&resolved, e)),
        };

        if !metadata.is_dir() {
            fs::remove_file(&resolved)
                .await
                .map_err(|e| io_error(&resolved, e))?;
            return Ok(true);
        }

        if recursive {
            fs::remove_dir_all(&resolved)
                .await
                .map_err(|e| io_error(&resolved, e))?;
        } else {
            let mut entries = fs::read_dir(&resolved)
                .await
                .map_err(|e| io_error(&resolved, e))?;
            if entries
                .next_entry()
                .await
                .map_err(|e| io_error(&resolved, e))?
                .is_some()
            {
                return Err(StorageError::NotEmpty(path.to_string()));
            }
            fs::remove_dir(&resolved)
                .await
                .map_err(|e| io_error(&resolved, e))?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        (dir, storage)
    }

    #[tokio::test]
    async fn test_mkdir_and_exists() {
        let (_dir, storage) = storage();

        assert!(!storage.exists("/base/acme").await.unwrap());
        storage.mkdir("/base/acme/resources").await.unwrap();
        storage.mkdir("/base/acme/resources").await.unwrap();

        assert!(storage.exists("/base/acme").await.unwrap());
        assert!(storage.exists("/base/acme/resources").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_file() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("t1/resources")).unwrap();
        std::fs::write(dir.path().join("t1/resources/a.txt"), b"hello").unwrap();

        storage
            .copy("/t1/resources/a.txt", "/t2/resources/a.txt", true, true)
            .await
            .unwrap();

        let copied = std::fs::read(dir.path().join("t2/resources/a.txt")).unwrap();
        assert_eq!(copied, b"hello");
    }

    #[tokio::test]
    async fn test_copy_without_overwrite() {
        let (dir, storage) = storage();
        std::fs::write(dir.path().join("a.txt"), b"new").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"old").unwrap();

        let result = storage.copy("/a.txt", "/b.txt", false, false).await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let (_dir, storage) = storage();

        let result = storage.copy("/missing.txt", "/dst.txt", true, true).await;
        assert!(matches!(result, Err(StorageError::NotFound(p)) if p == "/missing.txt"));
    }

    #[tokio::test]
    async fn test_copy_directory_tree() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("src/sub/deep")).unwrap();
        std::fs::write(dir.path().join("src/a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("src/sub/b.txt"), b"b").unwrap();

        storage.copy("/src", "/dst", true, true).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("dst/a.txt")).unwrap(), b"a");
        assert_eq!(std::fs::read(dir.path().join("dst/sub/b.txt")).unwrap(), b"b");
        assert!(dir.path().join("dst/sub/deep").is_dir());
    }

    #[tokio::test]
    async fn test_delete() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("home/7")).unwrap();
        std::fs::write(dir.path().join("home/7/x"), b"x").unwrap();

        assert!(matches!(
            storage.delete("/home/7", false).await,
            Err(StorageError::NotEmpty(_))
        ));
        assert!(storage.delete("/home/7", true).await.unwrap());
        assert!(!dir.path().join("home/7").exists());
        assert!(!storage.delete("/home/7", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_parent_segments() {
        let (_dir, storage) = storage();

        let result = storage.exists("/../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }
}
