//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{PutObject, StorageBackend, validate_key};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self`. Every successful `put` is counted, and
/// individual keys can be set up to fail.
///
/// # Examples
///
/// ```
/// use ferry_storage::{PutObject, StorageBackend, backend::MockBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default();
/// backend.put(PutObject::new("abc/app.js", b"let a;".to_vec())).await?;
/// assert!(backend.object("abc/app.js").await.is_some());
/// assert_eq!(backend.put_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockBackend {
    storage: RwLock<HashMap<String, PutObject>>,
    failing: HashSet<String>,
    puts: AtomicUsize,
}

impl MockBackend {
    /// Make every `put` to `key` fail with a network error.
    pub fn failing_on(mut self, key: impl Into<String>) -> Self {
        self.failing.insert(key.into());
        self
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// The full object (body plus headers) stored at `key`, if any.
    pub async fn object(&self, key: &str) -> Option<PutObject> {
        self.storage.read().await.get(key).cloned()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put(&self, mut object: PutObject) -> Result<()> {
        object.key = validate_key(&object.key)?;
        if self.failing.contains(&object.key) {
            exn::bail!(ErrorKind::Network(format!("mock failure for {}", object.key)));
        }
        self.storage.write().await.insert(object.key.clone(), object);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_read() {
        let backend = MockBackend::default();
        backend.put(PutObject::new("test.txt", b"hello".to_vec())).await.unwrap();
        assert_eq!(backend.object("test.txt").await.unwrap().body, b"hello");
        assert_eq!(backend.keys().await, vec!["test.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_key() {
        let backend = MockBackend::default().failing_on("bad.js");
        let err = backend.put(PutObject::new("bad.js", b"x".to_vec())).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.put_count(), 0);
        assert!(backend.object("bad.js").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let backend = MockBackend::default();
        let err = backend.put(PutObject::new("../escape", b"x".to_vec())).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }
}
