use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use afz_backend::{BackendError, BackendResult, Format, JsonFormat};
use feoxdb::{FeoxError, FeoxStore};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::{FeOxDbError, FeOxDbQueue, FeOxDbStorage};

/// Shared state behind every handle on one database.
pub(crate) struct Shared {
    pub(crate) db: FeoxStore,
    pub(crate) format: Box<dyn Format>,
    /// Serializes read-modify-write updates of bookkeeping records.
    pub(crate) index_lock: Mutex<()>,
}

impl Shared {
    pub(crate) fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, FeOxDbError> {
        match self.db.get(key.as_bytes()) {
            Ok(value) => Ok(Some(value)),
            Err(FeoxError::KeyNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn put_raw(&self, key: &str, value: &[u8]) -> Result<(), FeOxDbError> {
        self.db.insert(key.as_bytes(), value)?;
        Ok(())
    }

    pub(crate) fn delete(&self, key: &str) -> Result<bool, FeOxDbError> {
        if !self.db.contains_key(key.as_bytes()) {
            return Ok(false);
        }
        self.db.delete(key.as_bytes())?;
        Ok(true)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, FeOxDbError> {
        self.get_raw(key)?
            .map(|raw| {
                serde_json::from_slice(&raw).map_err(|source| FeOxDbError::Corrupted {
                    key: key.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    pub(crate) fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), FeOxDbError> {
        let raw = serde_json::to_vec(value).map_err(|source| FeOxDbError::Corrupted {
            key: key.to_owned(),
            source,
        })?;
        self.put_raw(key, &raw)
    }
}

/// Runs `f` against the database on the blocking thread pool.
pub(crate) async fn blocking<T, F>(shared: &Arc<Shared>, f: F) -> BackendResult<T>
where
    F: FnOnce(&Shared) -> BackendResult<T> + Send + 'static,
    T: Send + 'static,
{
    let shared = shared.clone();
    tokio::task::spawn_blocking(move || f(&shared))
        .await
        .map_err(|e| BackendError::InternalError(Box::new(e)))?
}

/// An opened FeOxDB database holding response stores and the submission
/// queue.
///
/// Use this when stores must survive restarts. For pure speed without
/// persistence, prefer `MokaStorage`.
///
/// ```no_run
/// use afz_feoxdb::FeOxDb;
///
/// let db = FeOxDb::builder()
///     .path("/var/lib/afz")
///     .max_file_size(1024 * 1024 * 1024)  // 1 GB
///     .max_memory(64 * 1024 * 1024)       // 64 MB
///     .build()?;
///
/// let storage = db.storage();
/// let queue = db.queue();
/// # Ok::<(), afz_feoxdb::FeOxDbError>(())
/// ```
///
/// Cloning is cheap; clones share the same underlying database.
#[derive(Clone)]
pub struct FeOxDb {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for FeOxDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeOxDb")
            .field("format", &self.shared.format)
            .finish()
    }
}

impl FeOxDb {
    /// Starts building a new database handle.
    pub fn builder() -> FeOxDbBuilder {
        FeOxDbBuilder::default()
    }

    /// In-memory database for tests.
    ///
    /// Data is lost when dropped. Equivalent to `builder().build()`.
    ///
    /// ```
    /// use afz_feoxdb::FeOxDb;
    ///
    /// let db = FeOxDb::in_memory().expect("Failed to create in-memory database");
    /// ```
    pub fn in_memory() -> Result<Self, FeOxDbError> {
        Self::builder().build()
    }

    /// Response stores kept in this database.
    pub fn storage(&self) -> FeOxDbStorage {
        FeOxDbStorage::new(self.shared.clone())
    }

    /// Submission queue kept in this database.
    pub fn queue(&self) -> FeOxDbQueue {
        FeOxDbQueue::new(self.shared.clone())
    }

    /// Forces pending writes to disk.
    ///
    /// FeOxDB buffers writes in memory and flushes them periodically.
    /// No-op in memory-only mode.
    pub fn flush(&self) {
        self.shared.db.flush();
    }
}

/// Builder for [`FeOxDb`].
pub struct FeOxDbBuilder {
    path: Option<PathBuf>,
    max_file_size: Option<u64>,
    max_memory: Option<usize>,
    format: Box<dyn Format>,
}

impl Default for FeOxDbBuilder {
    fn default() -> Self {
        Self {
            path: None,
            max_file_size: None,
            max_memory: None,
            format: Box::new(JsonFormat),
        }
    }
}

impl FeOxDbBuilder {
    /// Enables persistent storage at the given path.
    ///
    /// Without this, data lives only in memory and is lost on restart.
    /// If path is a directory, creates `afz.db` inside it.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Pre-allocates disk space and caps maximum storage.
    ///
    /// Writes fail when the file is full. Ignored in memory-only mode.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Limits RAM usage.
    ///
    /// FeOxDB has no automatic eviction; writes fail when the limit is reached.
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Format used for stored response snapshots. Defaults to [`JsonFormat`].
    pub fn value_format(mut self, format: impl Format + 'static) -> Self {
        self.format = Box::new(format);
        self
    }

    /// Opens the database.
    ///
    /// Fails if the database file can't be opened or created.
    pub fn build(self) -> Result<FeOxDb, FeOxDbError> {
        let mut builder = FeoxStore::builder();

        if let Some(mut path) = self.path {
            if path.as_os_str().is_empty() {
                return Err(FeOxDbError::InvalidConfig("empty database path".into()));
            }
            if path.is_dir() {
                path.push("afz.db");
            }
            tracing::debug!(path = %path.display(), "opening feoxdb");
            builder = builder.device_path(path.to_string_lossy().to_string());
        }

        if let Some(file_size) = self.max_file_size {
            builder = builder.file_size(file_size);
        }

        if let Some(memory) = self.max_memory {
            builder = builder.max_memory(memory);
        }

        let db = builder.build()?;

        Ok(FeOxDb {
            shared: Arc::new(Shared {
                db,
                format: self.format,
                index_lock: Mutex::new(()),
            }),
        })
    }
}
