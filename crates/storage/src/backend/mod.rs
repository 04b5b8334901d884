//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for publishing objects across different backends (a local
//! directory for `--dest`, S3-compatible services for remote publishing).

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::PutObject;
use async_trait::async_trait;

/// Unified interface for storage backends.
///
/// # Key Handling
/// Keys are `/`-separated and relative to the backend root. Implementations
/// must run them through [`validate_key`](crate::validate_key) before use.
///
/// # Examples
///
/// ```
/// use ferry_storage::{PutObject, StorageBackend, error::Result};
///
/// async fn publish_text(backend: &dyn StorageBackend, key: &str, body: &str) -> Result<()> {
///     backend.put(PutObject::new(key, body.as_bytes().to_vec()).with_content_type("text/plain")).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Store an object, replacing anything already at its key.
    async fn put(&self, object: PutObject) -> Result<()>;
}
