//! Local filesystem storage backend.
//!
//! Objects are written to a directory on the local filesystem via `tokio::fs`.
//! Only the body is persisted; HTTP metadata (content type, cache headers) has
//! nowhere to live on disk and is dropped.

use crate::error::ErrorKind;
use crate::{PutObject, StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use ferry_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("dest", "/srv/www/static")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend rooted at an absolute directory,
    /// creating it if it doesn't exist yet.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root.to_string_lossy().into_owned()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root.to_string_lossy().into_owned()));
            }
        } else {
            // Non-async: happens once, and keeps the constructor sync.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(key)?))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_string_lossy().into_owned()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, object), fields(backend = %self.name, key = %object.key, size = object.body.len()))]
    async fn put(&self, object: PutObject) -> Result<()> {
        let abs_path = self.absolute_path(&object.key)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, parent))?;
        }
        fs::write(&abs_path, &object.body).await.map_err(|e| Self::map_io_error(e, &abs_path))?;
        tracing::debug!(path = %abs_path.display(), "wrote object to disk");
        Ok(())
    }
}
