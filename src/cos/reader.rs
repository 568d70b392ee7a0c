//! Scoped local copies of remote objects
//!
//! A [`CosReader`] downloads one object into a private temp directory, hands
//! out a readable file, and removes the directory when the scope ends:
//!
//! ```no_run
//! # async fn demo(config: &cos_client::CosConfig) -> cos_client::Result<()> {
//! use cos_client::CosReader;
//! use tokio::io::AsyncReadExt;
//!
//! let mut reader = CosReader::new(config, "reports", "2024/q1.csv")?;
//! let rows = reader
//!     .read_with(|mut file| async move {
//!         let mut text = String::new();
//!         file.read_to_string(&mut text).await.ok();
//!         Ok(text.lines().count())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::CosConfig;
use crate::cos::client::CosClient;
use crate::cos::store::ObjectStore;
use crate::error::{CosError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unopened,
    Open,
    Closed,
}

pub struct CosReader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    scope_dir: PathBuf,
    local_path: PathBuf,
    state: ReaderState,
    file: Option<File>,
    /// The scope directory may exist on disk
    dirty: bool,
}

impl CosReader {
    pub fn new(config: &CosConfig, bucket: &str, key: &str) -> Result<Self> {
        Ok(Self::from_client(&CosClient::new(config)?, bucket, key))
    }

    /// Reader for `bucket/key`. Only computes the local path; no I/O.
    pub fn from_client(client: &CosClient, bucket: &str, key: &str) -> Self {
        let scope_dir = scope_dir_in(&std::env::temp_dir());
        Self {
            store: client.store().clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            local_path: local_path_for(&scope_dir, key),
            scope_dir,
            state: ReaderState::Unopened,
            file: None,
            dirty: false,
        }
    }

    /// Place the scope directory under `root` instead of the system temp dir.
    /// `root` must already exist; only the scope directory inside it is
    /// created and removed.
    pub fn in_dir(mut self, root: impl AsRef<Path>) -> Self {
        if self.state == ReaderState::Unopened {
            self.scope_dir = scope_dir_in(root.as_ref());
            self.local_path = local_path_for(&self.scope_dir, &self.key);
        }
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Where the local copy lives while the reader is open
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Download the object and open the local copy for reading.
    ///
    /// On failure the partial copy is removed and the reader stays
    /// unopened.
    pub async fn open(&mut self) -> Result<&mut File> {
        match self.state {
            ReaderState::Unopened => {}
            ReaderState::Open => return Err(CosError::ReaderState("already open")),
            ReaderState::Closed => return Err(CosError::ReaderState("closed")),
        }

        let file = match self.fetch().await {
            Ok(file) => file,
            Err(e) => {
                return Err(match self.remove_scope().await {
                    Ok(()) => e,
                    Err(cleanup) => e.with_cleanup_failure(cleanup),
                });
            }
        };

        self.state = ReaderState::Open;
        debug!(bucket = %self.bucket, key = %self.key, path = ?self.local_path, "Reader opened");
        Ok(self.file.insert(file))
    }

    async fn fetch(&mut self) -> Result<File> {
        self.dirty = true;
        tokio::fs::create_dir(&self.scope_dir)
            .await
            .map_err(|e| CosError::TempFile {
                path: self.scope_dir.clone(),
                source: e,
            })?;

        let nested = self.local_path.parent().filter(|p| *p != self.scope_dir.as_path());
        if let Some(parent) = nested {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CosError::TempFile {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        self.store
            .download_to_path(&self.bucket, &self.key, &self.local_path)
            .await
            .map_err(|e| e.into_transfer("download"))?;

        File::open(&self.local_path)
            .await
            .map_err(|e| CosError::TempFile {
                path: self.local_path.clone(),
                source: e,
            })
    }

    /// Close the file handle and delete the local copy.
    ///
    /// Closing an unopened or already closed reader is a no-op; an unopened
    /// reader can still be opened afterwards.
    pub async fn close(&mut self) -> Result<()> {
        if self.state != ReaderState::Open {
            return Ok(());
        }

        if let Some(file) = self.file.take() {
            // Wait for in-flight reads so the handle is really released
            drop(file.into_std().await);
        }
        self.state = ReaderState::Closed;

        self.remove_scope().await.map_err(|e| CosError::TempFile {
            path: self.scope_dir.clone(),
            source: e,
        })?;

        debug!(bucket = %self.bucket, key = %self.key, "Reader closed");
        Ok(())
    }

    /// Open, run `body` on the local file, then close.
    ///
    /// Cleanup runs whether `body` succeeds or fails. When both fail, the
    /// body's error is returned with the cleanup failure attached.
    pub async fn read_with<F, Fut, T>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(File) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.open().await?;

        let result = match self.file.take() {
            Some(file) => body(file).await,
            None => Err(CosError::ReaderState("not open")),
        };
        let closed = self.close().await;

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => Err(e.with_cleanup_failure(cleanup)),
        }
    }

    pub async fn read_to_bytes(&mut self) -> Result<Vec<u8>> {
        let path = self.local_path.clone();
        self.read_with(|mut file| async move {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .await
                .map_err(|e| CosError::TempFile { path, source: e })?;
            Ok(buf)
        })
        .await
    }

    pub async fn read_to_string(&mut self) -> Result<String> {
        let path = self.local_path.clone();
        self.read_with(|mut file| async move {
            let mut text = String::new();
            file.read_to_string(&mut text)
                .await
                .map_err(|e| CosError::TempFile { path, source: e })?;
            Ok(text)
        })
        .await
    }

    /// Remove the scope directory. Attempted once per open.
    async fn remove_scope(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;

        match tokio::fs::remove_dir_all(&self.scope_dir).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                warn!(path = ?self.scope_dir, error = %e, "Failed to remove reader temp directory");
                Err(e)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for CosReader {
    fn drop(&mut self) {
        self.file.take();
        if self.dirty {
            if let Err(e) = std::fs::remove_dir_all(&self.scope_dir) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = ?self.scope_dir, error = %e, "Failed to remove reader temp directory");
                }
            }
        }
    }
}

fn scope_dir_in(root: &Path) -> PathBuf {
    root.join(format!("cos-reader-{}", Uuid::new_v4()))
}

/// Map an object key to a path inside `scope_dir`. Empty, `.` and `..`
/// segments are dropped so the copy never escapes the scope.
fn local_path_for(scope_dir: &Path, key: &str) -> PathBuf {
    let mut path = scope_dir.to_path_buf();
    let mut pushed = false;
    for segment in key.split(['/', '\\']) {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        path.push(segment);
        pushed = true;
    }
    if !pushed {
        path.push("object");
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cos::memory::MemoryStore;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn reader(store: &Arc<MemoryStore>, root: &TempDir, key: &str) -> CosReader {
        CosReader::from_client(&CosClient::from_store(store.clone()), "docs", key).in_dir(root.path())
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_objects(
            "docs",
            &[("readme.txt", "hello reader"), ("nested/dir/notes.md", "# notes")],
        ))
    }

    fn is_empty_dir(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[test]
    fn test_construction_does_no_io() {
        let root = TempDir::new().unwrap();
        let r = reader(&store(), &root, "readme.txt");

        assert_eq!(r.state(), ReaderState::Unopened);
        assert!(r.local_path().starts_with(root.path()));
        assert!(r.local_path().ends_with("readme.txt"));
        assert!(is_empty_dir(&root));
    }

    #[test]
    fn test_paths_unique_per_reader() {
        let root = TempDir::new().unwrap();
        let store = store();
        let a = reader(&store, &root, "readme.txt");
        let b = reader(&store, &root, "readme.txt");
        assert_ne!(a.local_path(), b.local_path());
    }

    #[test]
    fn test_local_path_stays_in_scope() {
        let scope = Path::new("/tmp/cos-reader-x");
        assert_eq!(
            local_path_for(scope, "../../etc/passwd"),
            Path::new("/tmp/cos-reader-x/etc/passwd")
        );
        assert_eq!(local_path_for(scope, "a//b/./c"), Path::new("/tmp/cos-reader-x/a/b/c"));
        assert_eq!(local_path_for(scope, "/"), Path::new("/tmp/cos-reader-x/object"));
    }

    #[tokio::test]
    async fn test_read_to_string_cleans_up() {
        let root = TempDir::new().unwrap();
        let mut r = reader(&store(), &root, "readme.txt");

        assert_eq!(r.read_to_string().await.unwrap(), "hello reader");
        assert_eq!(r.state(), ReaderState::Closed);
        assert!(!r.local_path().exists());
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_nested_key() {
        let root = TempDir::new().unwrap();
        let mut r = reader(&store(), &root, "nested/dir/notes.md");

        assert_eq!(r.read_to_bytes().await.unwrap(), b"# notes");
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_body_error_still_cleans_up() {
        let root = TempDir::new().unwrap();
        let mut r = reader(&store(), &root, "readme.txt");

        let err = r
            .read_with(|_file| async {
                Err::<(), _>(CosError::Configuration("body failed".to_string()))
            })
            .await
            .unwrap_err();

        assert!(err.to_string().contains("body failed"));
        assert_eq!(r.state(), ReaderState::Closed);
        assert!(!r.local_path().exists());
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_missing_key_is_transfer_error() {
        let root = TempDir::new().unwrap();
        let mut r = reader(&store(), &root, "missing.txt");

        let err = r.open().await.unwrap_err();
        assert!(matches!(err, CosError::Transfer { .. }));
        assert_ne!(r.state(), ReaderState::Open);
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_partial_download_removed() {
        let root = TempDir::new().unwrap();
        let store = store();
        store.fail_partial_download.store(true, Ordering::SeqCst);
        let mut r = reader(&store, &root, "readme.txt");

        let err = r.read_to_string().await.unwrap_err();
        assert!(matches!(err, CosError::Transfer { .. }));
        assert!(!r.local_path().exists());
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_explicit_open_close() {
        let root = TempDir::new().unwrap();
        let mut r = reader(&store(), &root, "readme.txt");

        let file = r.open().await.unwrap();
        let mut text = String::new();
        file.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "hello reader");
        assert_eq!(r.state(), ReaderState::Open);
        assert!(r.local_path().exists());

        assert!(matches!(r.open().await, Err(CosError::ReaderState(_))));

        r.close().await.unwrap();
        assert_eq!(r.state(), ReaderState::Closed);
        assert!(!r.local_path().exists());
        assert!(is_empty_dir(&root));

        // Idempotent, and terminal
        r.close().await.unwrap();
        assert!(matches!(r.open().await, Err(CosError::ReaderState(_))));
    }

    #[tokio::test]
    async fn test_close_before_open_is_noop() {
        let root = TempDir::new().unwrap();
        let mut r = reader(&store(), &root, "readme.txt");

        r.close().await.unwrap();
        assert_eq!(r.state(), ReaderState::Unopened);

        r.open().await.unwrap();
        assert_eq!(r.state(), ReaderState::Open);
        r.close().await.unwrap();
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_missing_root_is_not_created() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("not-there");
        let mut r = CosReader::from_client(&CosClient::from_store(store()), "docs", "readme.txt")
            .in_dir(&missing);

        let err = r.open().await.unwrap_err();
        assert!(matches!(err, CosError::TempFile { .. }));
        assert_eq!(r.state(), ReaderState::Unopened);
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_open_copy() {
        let root = TempDir::new().unwrap();
        let path = {
            let mut r = reader(&store(), &root, "readme.txt");
            r.open().await.unwrap();
            assert!(r.local_path().exists());
            r.local_path().to_path_buf()
        };

        assert!(!path.exists());
        assert!(is_empty_dir(&root));
    }

    #[tokio::test]
    async fn test_concurrent_readers_same_key() {
        let root = TempDir::new().unwrap();
        let store = store();
        let mut a = reader(&store, &root, "readme.txt");
        let mut b = reader(&store, &root, "readme.txt");

        a.open().await.unwrap();
        b.open().await.unwrap();
        a.close().await.unwrap();

        assert!(b.local_path().exists());
        b.close().await.unwrap();
        assert!(is_empty_dir(&root));
    }
}
