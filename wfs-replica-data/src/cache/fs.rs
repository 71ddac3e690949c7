use std::io;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use wfs_replica_fs::{PathKind, ensure_dir, modified, path_kind, read_to_string, remove_file, write_replacing};

use super::{CacheError, CacheStore, Clock, SystemClock, is_expired};

/// File name that may be removed when it occupies the cache directory path.
pub const DISPOSABLE_CACHE_FILE: &str = ".wfs-replica";

/// Cache storing one file per key under a directory.
pub struct FsCacheStore {
    root: Utf8PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FsCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsCacheStore")
            .field("root", &self.root)
            .field("clock", &"<dyn Clock>")
            .finish()
    }
}

impl FsCacheStore {
    /// Open (creating if needed) a cache rooted at `root`, using the system
    /// clock.
    pub fn open(root: &Utf8Path) -> Result<Self, CacheError> {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    /// Open a cache with an explicit clock.
    ///
    /// A regular file at `root` is deleted when it is named
    /// [`DISPOSABLE_CACHE_FILE`]; any other file there is a configuration
    /// error.
    pub fn with_clock(root: &Utf8Path, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let prepare = |source: io::Error| CacheError::Prepare {
            path: root.to_owned(),
            source,
        };
        match path_kind(root).map_err(prepare)? {
            PathKind::Dir => {}
            PathKind::Missing => ensure_dir(root).map_err(prepare)?,
            PathKind::File if root.file_name() == Some(DISPOSABLE_CACHE_FILE) => {
                warn!("replacing stray file {root} with a cache directory");
                remove_file(root).map_err(prepare)?;
                ensure_dir(root).map_err(prepare)?;
            }
            PathKind::File | PathKind::Other => {
                return Err(CacheError::Configuration {
                    path: root.to_owned(),
                    reason: "path exists and is not a directory".to_owned(),
                });
            }
        }
        debug!("using cache directory {root}");
        Ok(Self {
            root: root.to_owned(),
            clock,
        })
    }

    /// Cache directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(key)
    }
}

impl CacheStore for FsCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key);
        match read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read { path, source }),
        }
    }

    fn put(&self, key: &str, contents: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        write_replacing(&path, contents).map_err(|source| CacheError::Write { path, source })
    }

    fn is_stale(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        let read_error = |source: io::Error| CacheError::Read {
            path: path.clone(),
            source,
        };
        if path_kind(&path).map_err(read_error)? != PathKind::File {
            return Ok(true);
        }
        let stamp = modified(&path).map_err(read_error)?;
        let contents = read_to_string(&path).map_err(read_error)?;
        Ok(is_expired(&contents, stamp, self.clock.now(), ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedClock;
    use rstest::{fixture, rstest};
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[fixture]
    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
        (dir, path)
    }

    #[rstest]
    fn creates_missing_directory(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = temp_root;
        let root = base.join("nested").join("cache");
        let store = FsCacheStore::open(&root).expect("open cache");
        assert_eq!(path_kind(store.root()).expect("classify"), PathKind::Dir);
    }

    #[rstest]
    fn replaces_disposable_file(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = temp_root;
        let root = base.join(DISPOSABLE_CACHE_FILE);
        write_replacing(&root, "stale").expect("write stray file");
        FsCacheStore::open(&root).expect("open cache");
        assert_eq!(path_kind(&root).expect("classify"), PathKind::Dir);
    }

    #[rstest]
    fn rejects_other_files(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = temp_root;
        let root = base.join("precious.txt");
        write_replacing(&root, "keep me").expect("write file");
        let err = FsCacheStore::open(&root).expect_err("file is not a cache");
        assert!(matches!(err, CacheError::Configuration { .. }));
        assert_eq!(read_to_string(&root).expect("read"), "keep me");
    }

    #[rstest]
    fn entries_go_stale_after_ttl(temp_root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = temp_root;
        let clock = Arc::new(FixedClock::new(SystemTime::now()));
        let store = FsCacheStore::with_clock(&base, clock.clone()).expect("open cache");
        let ttl = Duration::from_secs(3_600);
        assert!(store.is_stale("capabilities.json", ttl).expect("check"));
        store.put("capabilities.json", "{\"tables\":[]}").expect("put");
        assert!(!store.is_stale("capabilities.json", ttl).expect("check"));
        assert_eq!(
            store.get("capabilities.json").expect("get").as_deref(),
            Some("{\"tables\":[]}")
        );
        clock.advance(Duration::from_secs(7_200));
        assert!(store.is_stale("capabilities.json", ttl).expect("check"));
    }
}
