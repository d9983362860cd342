/// In-memory storage backend
///
/// Keeps the tree in a sorted map and records every operation it receives,
/// which lets tests assert on traversal order and on what was *not* touched.
/// Paths can be marked unavailable to simulate backend outages.
///
/// # Example
///
/// ```
/// use custodian_shared::storage::{MemoryStorage, Storage, StorageOp};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = MemoryStorage::new();
/// storage.put_file("/t1/resources/a.txt", b"hello").await?;
///
/// storage.copy("/t1/resources/a.txt", "/t2/resources/a.txt", true, true).await?;
///
/// assert_eq!(storage.read_file("/t2/resources/a.txt").await, Some(b"hello".to_vec()));
/// assert!(storage.is_directory("/t2/resources").await);
/// assert!(matches!(storage.operations().await.last(), Some(StorageOp::Copy { .. })));
/// # Ok(())
/// # }
/// ```

use super::{segments, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Operation received by a [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// `exists(path)`
    Exists(String),

    /// `mkdir(path)`
    Mkdir(String),

    /// `copy(src, dst, ..)`
    Copy { src: String, dst: String },

    /// `delete(path, ..)`
    Delete(String),
}

#[derive(Debug, Clone)]
enum Entry {
    Directory,
    File {
        content: Vec<u8>,
        modified_at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    operations: Vec<StorageOp>,
    unavailable: Vec<String>,
}

impl State {
    fn check_available(&self, path: &str) -> StorageResult<()> {
        if self
            .unavailable
            .iter()
            .any(|prefix| path == prefix || path.starts_with(&format!("{}/", prefix)))
        {
            return Err(StorageError::Unavailable(path.to_string()));
        }
        Ok(())
    }

    fn has_entry(&self, path: &str) -> bool {
        path == "/" || self.entries.contains_key(path)
    }

    fn is_directory(&self, path: &str) -> bool {
        path == "/" || matches!(self.entries.get(path), Some(Entry::Directory))
    }

    fn descendants(&self, path: &str) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };

        self.entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn make_dirs(&mut self, path: &str) -> StorageResult<()> {
        let mut current = String::new();

        for segment in segments(path)? {
            current.push('/');
            current.push_str(segment);

            match self.entries.get(&current) {
                Some(Entry::File { .. }) => return Err(StorageError::AlreadyExists(current)),
                Some(Entry::Directory) => {}
                None => {
                    self.entries.insert(current.clone(), Entry::Directory);
                }
            }
        }

        Ok(())
    }

    fn make_parent_dirs(&mut self, path: &str) -> StorageResult<()> {
        match path.rfind('/') {
            Some(idx) if idx > 0 => self.make_dirs(&path[..idx]),
            _ => Ok(()),
        }
    }

    fn write_file(
        &mut self,
        src_entry: &Entry,
        dst: &str,
        overwrite: bool,
        preserve_metadata: bool,
    ) -> StorageResult<()> {
        let Entry::File {
            content,
            modified_at,
        } = src_entry
        else {
            return Ok(());
        };

        match self.entries.get(dst) {
            Some(Entry::Directory) => return Err(StorageError::AlreadyExists(dst.to_string())),
            Some(Entry::File { .. }) if !overwrite => {
                return Err(StorageError::AlreadyExists(dst.to_string()))
            }
            _ => {}
        }

        self.make_parent_dirs(dst)?;
        self.entries.insert(
            dst.to_string(),
            Entry::File {
                content: content.clone(),
                modified_at: if preserve_metadata {
                    *modified_at
                } else {
                    Utc::now()
                },
            },
        );

        Ok(())
    }
}

fn normalize(path: &str) -> StorageResult<String> {
    let parts = segments(path)?;
    Ok(format!("/{}", parts.join("/")))
}

/// In-memory [`Storage`] implementation
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    /// Creates an empty storage tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a file without recording an operation
    ///
    /// Missing parent directories are created.
    pub async fn put_file(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        let path = normalize(path)?;
        let mut state = self.state.lock().await;
        state.make_parent_dirs(&path)?;
        state.entries.insert(
            path,
            Entry::File {
                content: content.to_vec(),
                modified_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Creates a directory without recording an operation
    pub async fn put_dir(&self, path: &str) -> StorageResult<()> {
        let path = normalize(path)?;
        self.state.lock().await.make_dirs(&path)
    }

    /// Reads a file's content
    pub async fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let path = normalize(path).ok()?;
        match self.state.lock().await.entries.get(&path) {
            Some(Entry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    /// Whether `path` is a directory
    pub async fn is_directory(&self, path: &str) -> bool {
        match normalize(path) {
            Ok(path) => self.state.lock().await.is_directory(&path),
            Err(_) => false,
        }
    }

    /// Whether anything exists at `path`, without recording an operation
    pub async fn contains(&self, path: &str) -> bool {
        match normalize(path) {
            Ok(path) => self.state.lock().await.has_entry(&path),
            Err(_) => false,
        }
    }

    /// Every path currently stored, sorted
    pub async fn paths(&self) -> Vec<String> {
        self.state.lock().await.entries.keys().cloned().collect()
    }

    /// Operations received so far, in order
    pub async fn operations(&self) -> Vec<StorageOp> {
        self.state.lock().await.operations.clone()
    }

    /// Forgets recorded operations
    pub async fn clear_operations(&self) {
        self.state.lock().await.operations.clear();
    }

    /// Makes every operation on `prefix` or below fail with `Unavailable`
    pub async fn set_unavailable(&self, prefix: &str) {
        if let Ok(prefix) = normalize(prefix) {
            self.state.lock().await.unavailable.push(prefix);
        }
    }

    /// Clears all simulated outages
    pub async fn set_available(&self) {
        self.state.lock().await.unavailable.clear();
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let path = normalize(path)?;
        let mut state = self.state.lock().await;
        state.operations.push(StorageOp::Exists(path.clone()));
        state.check_available(&path)?;

        Ok(state.has_entry(&path))
    }

    async fn mkdir(&self, path: &str) -> StorageResult<()> {
        let path = normalize(path)?;
        let mut state = self.state.lock().await;
        state.operations.push(StorageOp::Mkdir(path.clone()));
        state.check_available(&path)?;

        state.make_dirs(&path)
    }

    async fn copy(
        &self,
        src: &str,
        dst: &str,
        overwrite: bool,
        preserve_metadata: bool,
    ) -> StorageResult<()> {
        let src = normalize(src)?;
        let dst = normalize(dst)?;
        let mut state = self.state.lock().await;
        state.operations.push(StorageOp::Copy {
            src: src.clone(),
            dst: dst.clone(),
        });
        state.check_available(&src)?;
        state.check_available(&dst)?;

        let entry = match state.entries.get(&src) {
            Some(entry) => entry.clone(),
            None => return Err(StorageError::NotFound(src)),
        };

        match entry {
            Entry::File { .. } => state.write_file(&entry, &dst, overwrite, preserve_metadata),
            Entry::Directory => {
                state.make_dirs(&dst)?;

                for path in state.descendants(&src) {
                    let target = format!("{}{}", dst, &path[src.len()..]);
                    let child = match state.entries.get(&path) {
                        Some(child) => child.clone(),
                        None => continue,
                    };

                    match child {
                        Entry::Directory => state.make_dirs(&target)?,
                        Entry::File { .. } => {
                            state.write_file(&child, &target, overwrite, preserve_metadata)?
                        }
                    }
                }

                Ok(())
            }
        }
    }

    async fn delete(&self, path: &str, recursive: bool) -> StorageResult<bool> {
        let path = normalize(path)?;
        let mut state = self.state.lock().await;
        state.operations.push(StorageOp::Delete(path.clone()));
        state.check_available(&path)?;

        if !state.entries.contains_key(&path) {
            return Ok(false);
        }

        let descendants = state.descendants(&path);
        if !descendants.is_empty() && !recursive {
            return Err(StorageError::NotEmpty(path));
        }

        for descendant in descendants {
            state.entries.remove(&descendant);
        }
        state.entries.remove(&path);

        Ok(true)
    }
}
