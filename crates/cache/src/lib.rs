//! Persisted upload manifest.
//!
//! The manifest remembers which content-addressed keys have already been
//! uploaded, so a rerun over unchanged files makes no network calls. It is
//! ephemeral: it lives in the temp directory, and if it is deleted the worst
//! case is that some files are uploaded again under the same key.
//!
//! On disk it is a flat JSON object of `{ "key": true }`.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Distinguishes temp files of flushes racing within one process.
static FLUSH_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Location of the manifest for a given user and configuration.
///
/// Both parts go into the file name hash: switching accounts or buckets gives
/// a separate manifest, since "uploaded" only means something per bucket.
pub fn manifest_path(user: &str, config_identity: &str) -> PathBuf {
    let mut hasher = blake3::Hasher::new();
    hasher.update(user.as_bytes());
    hasher.update(b"\0");
    hasher.update(config_identity.as_bytes());
    let hash = hasher.finalize().to_hex();
    std::env::temp_dir().join(format!("ferry-manifest-{}.json", &hash[..16]))
}

/// Map from storage key to "already uploaded".
///
/// Shared by reference across concurrent publishes. The lock is a plain
/// (synchronous) one and is only held for map access, never across an await.
#[derive(Debug)]
pub struct UploadCache {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, bool>>,
}

impl UploadCache {
    /// An empty cache that will be persisted at `path`. Nothing is read until
    /// [`load`](Self::load).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), entries: RwLock::default() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merge the on-disk manifest into memory.
    ///
    /// The merge is a union: entries already in memory are kept, and an
    /// uploaded key never goes back to not-uploaded. A missing manifest is an
    /// empty one; a corrupt manifest is logged and treated as empty.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> usize {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(err) => {
                tracing::warn!(error = %err, "could not read upload manifest, starting empty");
                return 0;
            },
        };
        let on_disk: BTreeMap<String, bool> = match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(error = %err, "corrupt upload manifest, starting empty");
                return 0;
            },
        };
        let loaded = on_disk.len();
        self.merge(on_disk);
        tracing::debug!(entries = loaded, "loaded upload manifest");
        loaded
    }

    fn merge(&self, other: BTreeMap<String, bool>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for (key, uploaded) in other {
            let entry = entries.entry(key).or_insert(false);
            *entry |= uploaded;
        }
    }

    pub fn has(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).copied().unwrap_or(false)
    }

    pub fn mark_uploaded(&self, key: impl Into<String>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.into(), true);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the merged map back to disk as pretty JSON.
    ///
    /// Whatever another process flushed since our `load` is merged in first,
    /// so concurrent runs don't erase each other's entries. The JSON goes to a
    /// sibling temp file that is then renamed over the manifest, so readers
    /// never see a partial write.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn flush(&self) -> Result<()> {
        self.load().await;
        let json = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            serde_json::to_vec_pretty(&*entries).or_raise(|| ErrorKind::InvalidData)?
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await.or_raise(|| ErrorKind::Io(temp.clone()))?;
        if let Err(err) = tokio::fs::rename(&temp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                tracing::warn!(path = %temp.display(), error = %cleanup, "could not remove temp manifest");
            }
            return Err(err).or_raise(|| ErrorKind::Io(self.path.clone()));
        }
        tracing::debug!(entries = self.len(), "flushed upload manifest");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.{}.tmp", std::process::id(), FLUSH_SEQUENCE.fetch_add(1, Ordering::Relaxed)));
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> UploadCache {
        UploadCache::open(dir.path().join("manifest.json"))
    }

    #[rstest]
    #[case("alice", "bucket-a", "alice", "bucket-b")]
    #[case("alice", "bucket-a", "bob", "bucket-a")]
    fn test_manifest_path_depends_on_identity(
        #[case] user_a: &str,
        #[case] config_a: &str,
        #[case] user_b: &str,
        #[case] config_b: &str,
    ) {
        assert_ne!(manifest_path(user_a, config_a), manifest_path(user_b, config_b));
        assert_eq!(manifest_path(user_a, config_a), manifest_path(user_a, config_a));
    }

    #[test]
    fn test_manifest_path_in_temp_dir() {
        let path = manifest_path("alice", "bucket");
        assert!(path.starts_with(std::env::temp_dir()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("ferry-manifest-") && name.ends_with(".json"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert_eq!(cache.load().await, 0);
        assert!(cache.is_empty());
        assert!(!cache.has("0123456789abcdef/app.js"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), b"{not json").unwrap();
        let cache = cache_in(&dir);
        assert_eq!(cache.load().await, 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_flush_then_reload() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.mark_uploaded("0123456789abcdef/app.js");
        cache.flush().await.unwrap();

        let reopened = cache_in(&dir);
        assert_eq!(reopened.load().await, 1);
        assert!(reopened.has("0123456789abcdef/app.js"));
    }

    #[tokio::test]
    async fn test_load_is_a_union() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), br#"{"a/x.css": false, "b/y.js": true}"#).unwrap();
        let cache = cache_in(&dir);
        cache.mark_uploaded("a/x.css");
        cache.mark_uploaded("c/z.png");
        cache.load().await;
        assert!(cache.has("a/x.css"), "true must never become false");
        assert!(cache.has("b/y.js"));
        assert!(cache.has("c/z.png"));
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_flush_keeps_entries_written_by_others() {
        let dir = TempDir::new().unwrap();
        let first = cache_in(&dir);
        let second = cache_in(&dir);
        first.mark_uploaded("a/one.js");
        second.mark_uploaded("b/two.js");
        first.flush().await.unwrap();
        second.flush().await.unwrap();

        let reopened = cache_in(&dir);
        reopened.load().await;
        assert!(reopened.has("a/one.js"));
        assert!(reopened.has("b/two.js"));
    }

    fn dir_entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_flush_replaces_corrupt_manifest_without_leftovers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), b"{ truncated").unwrap();
        let cache = cache_in(&dir);
        cache.mark_uploaded("a/one.js");
        cache.flush().await.unwrap();

        assert_eq!(dir_entries(&dir), vec!["manifest.json".to_string()]);
        let written: BTreeMap<String, bool> =
            serde_json::from_slice(&std::fs::read(dir.path().join("manifest.json")).unwrap()).unwrap();
        assert_eq!(written.get("a/one.js"), Some(&true));
    }

    #[tokio::test]
    async fn test_racing_flushes_leave_valid_manifest() {
        let dir = TempDir::new().unwrap();
        let first = cache_in(&dir);
        let second = cache_in(&dir);
        first.mark_uploaded("a/one.js");
        second.mark_uploaded("b/two.js");
        let (a, b) = tokio::join!(first.flush(), second.flush());
        a.unwrap();
        b.unwrap();

        assert_eq!(dir_entries(&dir), vec!["manifest.json".to_string()]);
        let reopened = cache_in(&dir);
        assert!(reopened.load().await >= 1);
    }
}
