//! Cache Store Module
//!
//! File-backed cache engine: one file per key, TTL checked lazily on read.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, Clock};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::filesystem::{Filesystem, NodeKind};

/// Upper bound on removals in flight during `clear`
const MAX_CONCURRENT_REMOVALS: usize = 64;

// == File Cache ==
/// Key/value cache persisted as one file per key under a base directory.
///
/// Holds no entries in memory; the filesystem is the only source of truth.
/// Cloning is cheap and shares the underlying filesystem handle.
#[derive(Clone)]
pub struct FileCache {
    /// Filesystem primitives used for every operation
    filesystem: Arc<dyn Filesystem>,
    /// Base directory, expected to end with a path separator
    base_path: String,
    /// Time source for writing and checking expiry
    clock: Clock,
}

impl FileCache {
    // == Constructor ==
    /// Creates a new FileCache rooted at `base_path` using the monotonic clock.
    ///
    /// # Arguments
    /// * `filesystem` - Filesystem primitives to store entries with
    /// * `base_path` - Base directory; keys are appended to it verbatim, so it
    ///   must end with a path separator
    pub fn new(filesystem: Arc<dyn Filesystem>, base_path: impl Into<String>) -> Self {
        Self::with_clock(filesystem, base_path, Clock::monotonic())
    }

    /// Creates a new FileCache with an explicit clock.
    pub fn with_clock(
        filesystem: Arc<dyn Filesystem>,
        base_path: impl Into<String>,
        clock: Clock,
    ) -> Self {
        Self {
            filesystem,
            base_path: base_path.into(),
            clock,
        }
    }

    /// Creates a new FileCache from configuration.
    pub fn from_config(filesystem: Arc<dyn Filesystem>, config: &CacheConfig) -> Self {
        Self::with_clock(filesystem, config.base_path.clone(), config.clock.build())
    }

    /// Returns the base directory.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the file path backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.base_path, key))
    }

    fn now(&self) -> f64 {
        self.clock.now()
    }

    // == Has ==
    /// Returns true if a file exists for `key`.
    ///
    /// Any failure, including a missing file, is reported as `false`.
    /// Expiry is not checked.
    pub async fn has(&self, key: &str) -> bool {
        if !is_valid_key(key) {
            return false;
        }
        self.filesystem.file_exists(&self.path_for(key)).await.is_ok()
    }

    // == Get ==
    /// Retrieves a value by key, returning `default` on a miss.
    ///
    /// An expired entry is deleted and counts as a miss.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read, or if its contents are
    /// not an entry holding a `V`.
    pub async fn get<V: DeserializeOwned>(&self, key: &str, default: V) -> Result<V> {
        Ok(self.try_get(key).await?.unwrap_or(default))
    }

    /// Retrieves a value by key. `None` means missing or expired.
    pub async fn try_get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>> {
        if !self.has(key).await {
            debug!("Cache miss: {}", key);
            return Ok(None);
        }

        let path = self.path_for(key);
        let bytes = self
            .filesystem
            .read_file(&path)
            .await
            .map_err(|source| CacheError::Read {
                path: path.clone(),
                source,
            })?;
        let entry: CacheEntry<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|source| CacheError::Decode {
                path: path.clone(),
                source,
            })?;

        if entry.has_expired(self.now()) {
            // Lazy eviction; the caller sees a miss whether or not removal worked
            if let Err(err) = self.filesystem.remove_file(&path).await {
                debug!("Failed to evict expired entry {}: {}", key, err);
            }
            debug!("Cache miss (expired): {}", key);
            return Ok(None);
        }

        let value = serde_json::from_value(entry.into_data())
            .map_err(|source| CacheError::Decode { path, source })?;
        debug!("Cache hit: {}", key);
        Ok(Some(value))
    }

    // == Set ==
    /// Stores a value with an optional TTL in seconds.
    ///
    /// Parent directories of hierarchical keys (`a/b/c`) are created on demand.
    ///
    /// # Returns
    /// - `Ok(true)` if the entry was written
    /// - `Ok(false)` if it was not cached (write failure, non-finite TTL)
    ///
    /// # Errors
    /// Fails for an invalid key, an unencodable value, or a parent directory
    /// that could not be created.
    pub async fn set<V>(&self, key: &str, value: &V, ttl: Option<f64>) -> Result<bool>
    where
        V: Serialize + ?Sized,
    {
        if !is_valid_key(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        if ttl.is_some_and(|ttl| !ttl.is_finite()) {
            warn!("Refusing to cache {} with non-finite TTL", key);
            return Ok(false);
        }

        if let Some((parent, _)) = key.rsplit_once(MAIN_SEPARATOR) {
            self.create_parent(parent).await?;
        }

        let entry = CacheEntry::new(value, ttl.map(|ttl| self.now() + ttl));
        let bytes = serde_json::to_vec(&entry).map_err(CacheError::Encode)?;

        let path = self.path_for(key);
        match self.filesystem.write_file(&path, &bytes).await {
            Ok(()) => {
                debug!("Cache set: {} ({} bytes)", key, bytes.len());
                Ok(true)
            }
            Err(err) => {
                warn!("Failed to write cache entry {}: {}", path.display(), err);
                Ok(false)
            }
        }
    }

    /// Concurrent writers may race to create the same directory, so an
    /// existing one counts as success.
    async fn create_parent(&self, parent: &str) -> Result<()> {
        let dir = self.path_for(parent);
        match self.filesystem.create_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(CacheError::CreateDirectory { path: dir, source }),
        }
    }

    // == Delete ==
    /// Removes the entry for `key`.
    ///
    /// Returns `false` if removal failed for any reason, including the key
    /// not existing.
    pub async fn delete(&self, key: &str) -> bool {
        if !is_valid_key(key) {
            return false;
        }

        let existed = self.has(key).await;
        let path = self.path_for(key);
        match self.filesystem.remove_file(&path).await {
            Ok(()) => {
                debug!("Cache delete: {}", key);
                true
            }
            Err(err) => {
                if existed {
                    warn!("Failed to remove cache entry {}: {}", path.display(), err);
                }
                false
            }
        }
    }

    // == Batch Operations ==
    /// Retrieves several keys concurrently.
    ///
    /// Every key is present in the result, mapped to its value or `default`.
    /// All reads settle before the first error, if any, is returned.
    pub async fn get_multiple<K, V>(&self, keys: &[K], default: V) -> Result<HashMap<String, V>>
    where
        K: AsRef<str>,
        V: DeserializeOwned + Clone,
    {
        let default = &default;
        let results = join_all(keys.iter().map(|key| async move {
            let key = key.as_ref();
            self.get(key, default.clone())
                .await
                .map(|value| (key.to_string(), value))
        }))
        .await;

        results.into_iter().collect()
    }

    /// Stores several entries concurrently with the same TTL.
    ///
    /// Returns `Ok(true)` only if every write succeeded. A failed write does
    /// not stop the others.
    pub async fn set_multiple<K, V, I>(&self, entries: I, ttl: Option<f64>) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let results = join_all(
            entries
                .iter()
                .map(|(key, value)| self.set(key.as_ref(), value, ttl)),
        )
        .await;

        all_succeeded(results)
    }

    /// Removes several keys concurrently.
    ///
    /// Returns `true` only if every removal succeeded.
    pub async fn delete_multiple<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        join_all(keys.iter().map(|key| self.delete(key.as_ref())))
            .await
            .into_iter()
            .all(|deleted| deleted)
    }

    // == Clear ==
    /// Removes every file below the base directory. Directories are left in place.
    ///
    /// Files are removed while the listing is still streaming in, at most
    /// `MAX_CONCURRENT_REMOVALS` at a time.
    ///
    /// # Errors
    /// Fails if the listing fails (including a missing base directory) or if
    /// any file cannot be removed.
    pub async fn clear(&self) -> Result<bool> {
        let base = PathBuf::from(&self.base_path);
        let removed = AtomicUsize::new(0);

        self.filesystem
            .list_recursive(&base)
            .map_err(|source| CacheError::Listing {
                path: base.clone(),
                source,
            })
            .try_for_each_concurrent(MAX_CONCURRENT_REMOVALS, |node| {
                let removed = &removed;
                async move {
                    if node.kind != NodeKind::File {
                        return Ok::<(), CacheError>(());
                    }
                    self.filesystem
                        .remove_file(&node.path)
                        .await
                        .map_err(|source| CacheError::Remove {
                            path: node.path,
                            source,
                        })?;
                    removed.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
            })
            .await?;

        info!(
            "Cache cleared: removed {} files under {}",
            removed.into_inner(),
            self.base_path
        );
        Ok(true)
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("base_path", &self.base_path)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

// == Utility Functions ==
/// Keys must be non-empty and stay below the base directory.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !Path::new(key)
            .components()
            .any(|component| matches!(component, Component::ParentDir))
}

/// Folds per-key results: the first error wins, otherwise true iff all succeeded.
fn all_succeeded(results: Vec<Result<bool>>) -> Result<bool> {
    results
        .into_iter()
        .try_fold(true, |all, result| Ok(result? && all))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::LocalFilesystem;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_cache() -> (TempDir, FileCache) {
        let dir = TempDir::new().unwrap();
        let base = format!("{}{}", dir.path().display(), MAIN_SEPARATOR);
        let cache = FileCache::new(Arc::new(LocalFilesystem::new()), base);
        (dir, cache)
    }

    fn key(parts: &[&str]) -> String {
        parts.join(std::path::MAIN_SEPARATOR_STR)
    }

    #[test]
    fn test_path_for_concatenates() {
        let cache = FileCache::new(Arc::new(LocalFilesystem::new()), "/var/cache/");
        assert_eq!(cache.path_for("entry"), PathBuf::from("/var/cache/entry"));
        assert_eq!(cache.base_path(), "/var/cache/");
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("file.name"));
        assert!(is_valid_key(&key(&["a", "b", "c"])));
        assert!(is_valid_key("..hidden"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(&key(&["..", "escape"])));
        assert!(!is_valid_key(&key(&["a", "..", "..", "b"])));
    }

    #[test]
    fn test_all_succeeded() {
        assert!(all_succeeded(vec![Ok(true), Ok(true)]).unwrap());
        assert!(!all_succeeded(vec![Ok(true), Ok(false)]).unwrap());
        assert!(all_succeeded(vec![]).unwrap());
        assert!(matches!(
            all_succeeded(vec![Ok(false), Err(CacheError::InvalidKey(String::new()))]),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_has_not() {
        let (_dir, cache) = create_test_cache();
        assert!(!cache.has("file.name").await);
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (_dir, cache) = create_test_cache();

        assert!(cache.set("key1", "value1", None).await.unwrap());
        let value: String = cache.get("key1", String::new()).await.unwrap();

        assert_eq!(value, "value1");
        assert!(cache.has("key1").await);
    }

    #[tokio::test]
    async fn test_get_missing_returns_default() {
        let (_dir, cache) = create_test_cache();

        let value = cache.get("missing", 42u32).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(cache.try_get::<u32>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrite() {
        let (_dir, cache) = create_test_cache();

        cache.set("key1", "value1", None).await.unwrap();
        cache.set("key1", "value2", None).await.unwrap();

        let value: String = cache.get("key1", String::new()).await.unwrap();
        assert_eq!(value, "value2");
    }

    #[tokio::test]
    async fn test_set_writes_expiry() {
        let (dir, cache) = create_test_cache();
        let before = Clock::Wall.now();

        cache.set("key1", &[1, 2, 3], Some(60.0)).await.unwrap();

        let bytes = std::fs::read(dir.path().join("key1")).unwrap();
        let entry: CacheEntry<Vec<u8>> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entry.data(), &vec![1, 2, 3]);
        let expires_at = entry.expires_at().unwrap();
        assert!(expires_at >= before + 59.0 && expires_at <= before + 61.0);
    }

    #[tokio::test]
    async fn test_ttl_expiration_evicts_file() {
        let (dir, cache) = create_test_cache();

        cache.set("key1", "value1", Some(0.1)).await.unwrap();
        assert_eq!(cache.get("key1", "default".to_string()).await.unwrap(), "value1");

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get("key1", "default".to_string()).await.unwrap(), "default");
        assert!(!cache.has("key1").await, "Expired read should delete the file");
        assert!(!dir.path().join("key1").exists());
    }

    #[tokio::test]
    async fn test_negative_ttl_is_already_expired() {
        let (_dir, cache) = create_test_cache();

        assert!(cache.set("key1", "value1", Some(-1.0)).await.unwrap());
        assert!(cache.has("key1").await);
        assert_eq!(cache.try_get::<String>("key1").await.unwrap(), None);
        assert!(!cache.has("key1").await);
    }

    #[tokio::test]
    async fn test_non_finite_ttl_is_not_cached() {
        let (_dir, cache) = create_test_cache();

        assert!(!cache.set("key1", "value1", Some(f64::NAN)).await.unwrap());
        assert!(!cache.set("key1", "value1", Some(f64::INFINITY)).await.unwrap());
        assert!(!cache.has("key1").await);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, cache) = create_test_cache();

        cache.set("key1", "value1", None).await.unwrap();
        assert!(cache.delete("key1").await);
        assert!(!cache.has("key1").await);
    }

    #[tokio::test]
    async fn test_delete_nonexistent() {
        let (_dir, cache) = create_test_cache();
        assert!(!cache.delete("file.name").await);
    }

    #[tokio::test]
    async fn test_invalid_keys() {
        let (_dir, cache) = create_test_cache();
        let escape = key(&["..", "escape"]);

        assert!(matches!(
            cache.set("", "value", None).await,
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.set(&escape, "value", None).await,
            Err(CacheError::InvalidKey(_))
        ));
        assert!(!cache.has("").await);
        assert!(!cache.delete(&escape).await);
        assert_eq!(cache.get("", 7).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_hierarchical_key_creates_directories() {
        let (dir, cache) = create_test_cache();
        let first = key(&["a", "b", "c"]);
        let second = key(&["a", "b", "d"]);

        assert!(cache.set(&first, "v1", None).await.unwrap());
        assert!(dir.path().join("a").join("b").is_dir());
        assert!(dir.path().join("a").join("b").join("c").is_file());

        assert!(cache.set(&second, "v2", None).await.unwrap());
        assert_eq!(cache.get(&second, String::new()).await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_get_type_mismatch_is_decode_error() {
        let (_dir, cache) = create_test_cache();

        cache.set("key1", "not a number", None).await.unwrap();
        let result = cache.get("key1", 0u64).await;
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_get_corrupt_file_is_decode_error() {
        let (dir, cache) = create_test_cache();

        std::fs::write(dir.path().join("key1"), b"a:1:{garbage").unwrap();
        let result = cache.get("key1", String::new()).await;
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_get_directory_is_read_error() {
        let (dir, cache) = create_test_cache();

        std::fs::create_dir(dir.path().join("folder")).unwrap();
        let result = cache.get("folder", String::new()).await;
        assert!(matches!(result, Err(CacheError::Read { .. })));
    }

    #[tokio::test]
    async fn test_get_as_option() {
        let (_dir, cache) = create_test_cache();

        cache.set("key1", "value1", None).await.unwrap();
        let value: Option<String> = cache.get("key1", None).await.unwrap();
        assert_eq!(value.as_deref(), Some("value1"));

        let value: Option<String> = cache.get("missing", None).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let (_dir, cache) = create_test_cache();

        let entries = [("k1", 1), ("k2", 2), ("k3", 3)];
        assert!(cache.set_multiple(entries, None).await.unwrap());

        let values = cache.get_multiple(&["k1", "k2", "k3", "k4"], 0).await.unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values["k1"], 1);
        assert_eq!(values["k3"], 3);
        assert_eq!(values["k4"], 0);

        assert!(!cache.delete_multiple(&["k1", "k2", "k4"]).await);
        assert!(!cache.has("k1").await);
        assert!(!cache.has("k2").await);
        assert!(cache.delete_multiple(&["k3"]).await);
    }

    #[tokio::test]
    async fn test_set_multiple_error_wins_regardless_of_order() {
        let (dir, cache) = create_test_cache();
        // A directory where the entry file should go makes the write fail
        std::fs::create_dir(dir.path().join("isdir")).unwrap();

        let failed_first = cache.set_multiple(vec![("isdir", 1), ("", 2)], None).await;
        assert!(matches!(failed_first, Err(CacheError::InvalidKey(_))));

        let failed_last = cache.set_multiple(vec![("", 2), ("isdir", 1)], None).await;
        assert!(matches!(failed_last, Err(CacheError::InvalidKey(_))));

        assert!(!cache.set_multiple(vec![("isdir", 1), ("ok", 2)], None).await.unwrap());
        assert_eq!(cache.get("ok", 0).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_removes_files_keeps_directories() {
        let (dir, cache) = create_test_cache();
        let nested = key(&["dir", "sub", "leaf"]);

        cache.set("top", "1", None).await.unwrap();
        cache.set(&nested, "2", None).await.unwrap();

        assert!(cache.clear().await.unwrap());
        assert!(!cache.has("top").await);
        assert!(!cache.has(&nested).await);
        assert!(dir.path().join("dir").join("sub").is_dir());
    }

    #[tokio::test]
    async fn test_clear_missing_base_is_listing_error() {
        let dir = TempDir::new().unwrap();
        let base = format!("{}{}", dir.path().join("absent").display(), MAIN_SEPARATOR);
        let cache = FileCache::new(Arc::new(LocalFilesystem::new()), base);

        assert!(matches!(cache.clear().await, Err(CacheError::Listing { .. })));
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let config = CacheConfig {
            base_path: format!("{}{}", dir.path().display(), MAIN_SEPARATOR),
            clock: crate::config::ClockKind::Wall,
        };
        let cache = FileCache::from_config(Arc::new(LocalFilesystem::new()), &config);

        assert_eq!(cache.base_path(), config.base_path);
        assert!(cache.set("key1", &true, Some(30.0)).await.unwrap());
        assert!(cache.get("key1", false).await.unwrap());
    }
}
