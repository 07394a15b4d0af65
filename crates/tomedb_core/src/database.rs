//! Database facade: open/replay, mutations, queries, record expiry.

use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::expiry::ExpiryQueue;
use crate::index::EngineState;
use crate::record::{Record, RecordId};
use crate::wal::{ChunkLog, LogEntry};

/// Advisory lock file keeping a data directory single-instance.
const LOCK_FILE: &str = "LOCK";

/// The main database handle.
///
/// A `Database` owns one data directory: an append-only chunk log plus the
/// in-memory record set and secondary indexes rebuilt from it on open.
/// Mutations are durable-first: the log entry is appended (and flushed)
/// before the in-memory state changes, so memory only ever reflects logged
/// entries.
///
/// # Ordering
///
/// All mutations for one `Database` are serialized through a single writer
/// lock: appends are FIFO and applied order matches call order, which also
/// makes chunk rotation race-free. Reads take a shared lock and do not
/// block each other.
///
/// # Example
///
/// ```rust,ignore
/// use tomedb_core::{Config, Database};
///
/// let db = Database::open(Path::new("my_data"), "")?;
/// let id = db.insert([("name".into(), "a".into())].into_iter().collect(), None)?;
/// assert!(db.get(id).is_some());
/// ```
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    path: PathBuf,
    /// Writer lock: held across append + apply so applied order matches
    /// append order.
    log: Mutex<ChunkLog>,
    state: RwLock<EngineState>,
    expiry: ExpiryQueue,
    /// Held for the lifetime of the handle; releasing it frees the
    /// directory for the next instance.
    _lock_file: File,
}

impl Database {
    /// Opens a database with default configuration.
    ///
    /// `key` is the caller's credential; with the default configuration no
    /// secret is set, so any key is accepted. See
    /// [`open_with_config`](Self::open_with_config).
    pub fn open(path: &Path, key: &str) -> StoreResult<Self> {
        Self::open_with_config(path, key, Config::default())
    }

    /// Opens a database from a data directory.
    ///
    /// The method:
    /// - equality-checks `key` against `config.api_key` (when set) before
    ///   touching the file system, failing with [`StoreError::InvalidApiKey`]
    /// - acquires an exclusive lock on the directory ([`StoreError::DatabaseLocked`]
    ///   when another instance holds it)
    /// - replays every existing chunk through the live apply path, skipping
    ///   malformed lines and chunks with a warning
    pub fn open_with_config(path: &Path, key: &str, config: Config) -> StoreResult<Self> {
        if let Some(expected) = &config.api_key {
            if key != expected {
                return Err(StoreError::InvalidApiKey);
            }
        }

        if !path.exists() {
            if config.create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("data directory does not exist: {}", path.display()),
                )
                .into());
            }
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::DatabaseLocked);
        }

        let log = ChunkLog::open(path, &config.base_name, config.chunk_size_limit, config.sync_on_write)?;

        let mut state = EngineState::new();
        let entries = log.load()?;
        let replayed = entries.len();
        for entry in &entries {
            state.apply(entry);
        }
        info!(
            path = %path.display(),
            entries = replayed,
            records = state.len(),
            "opened database"
        );

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let expiry = ExpiryQueue::start(move |id| {
                let Some(inner) = weak.upgrade() else { return };
                match inner.delete(id) {
                    Ok(true) => debug!(%id, "temporary record expired"),
                    Ok(false) => {}
                    Err(err) => warn!(%id, %err, "failed to delete expired record"),
                }
            });

            Inner {
                config,
                path: path.to_path_buf(),
                log: Mutex::new(log),
                state: RwLock::new(state),
                expiry,
                _lock_file: lock_file,
            }
        });

        Ok(Self { inner })
    }

    /// Inserts a record and returns its id.
    ///
    /// The id is allocated synchronously at call entry; the record becomes
    /// visible to reads once its log entry is durably appended and applied.
    /// Fails only on reserved field names or persistence failure (in which
    /// case the allocated id is burned, never reused, and no state changes).
    pub fn insert(
        &self,
        fields: Map<String, Value>,
        metadata: Option<Value>,
    ) -> StoreResult<RecordId> {
        self.inner.insert(fields, metadata)
    }

    /// Inserts a record that deletes itself after `ttl`.
    ///
    /// The scheduled delete is keyed by the returned id and can be
    /// cancelled with [`cancel_expiry`](Self::cancel_expiry) until it fires.
    pub fn insert_temporary(
        &self,
        ttl: Duration,
        fields: Map<String, Value>,
        metadata: Option<Value>,
    ) -> StoreResult<RecordId> {
        let id = self.inner.insert(fields, metadata)?;
        self.inner.expiry.schedule(id, Instant::now() + ttl);
        Ok(id)
    }

    /// Cancels the pending scheduled delete for a temporary record.
    ///
    /// Returns whether a pending timer was found and cancelled. Has no
    /// effect once the timer has fired, and never resurrects a deleted
    /// record.
    pub fn cancel_expiry(&self, id: RecordId) -> bool {
        self.inner.expiry.cancel(id)
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.inner.state.read().get(id).cloned()
    }

    /// Evaluates an equality filter over the secondary indexes.
    ///
    /// Constraint names select the top-level index, except the reserved
    /// name `metadata` which selects the metadata index. An empty
    /// constraint set returns every live record. Results are in storage
    /// (insertion) order.
    #[must_use]
    pub fn filter(&self, constraints: &Map<String, Value>) -> Vec<Record> {
        self.inner.state.read().filter(constraints)
    }

    /// Applies a shallow field merge to a record.
    ///
    /// Returns false (writing no log entry) when the id is not live. Each
    /// field named in `changes` replaces its prior value wholesale; a
    /// `metadata` key swaps the whole metadata value.
    pub fn update(&self, id: RecordId, changes: Map<String, Value>) -> StoreResult<bool> {
        self.inner.update(id, changes)
    }

    /// Deletes a record.
    ///
    /// Returns false (writing no log entry) when the id is not live.
    /// Deleted ids are never reassigned.
    pub fn delete(&self, id: RecordId) -> StoreResult<bool> {
        self.inner.delete(id)
    }

    /// Snapshot copy of every live record, in storage order.
    #[must_use]
    pub fn all(&self) -> Vec<Record> {
        self.inner.state.read().all()
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.read().len()
    }

    /// Whether no record is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.read().is_empty()
    }

    /// The highest id assigned so far, if any.
    #[must_use]
    pub fn last_id(&self) -> Option<RecordId> {
        self.inner.state.read().last_id()
    }

    /// The next id that will be assigned.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.inner.state.read().next_id()
    }

    /// Number of distinct indexed top-level field names.
    #[must_use]
    pub fn indexed_field_count(&self) -> usize {
        self.inner.state.read().indexed_field_count()
    }

    /// Number of scheduled deletes still pending.
    #[must_use]
    pub fn pending_expirations(&self) -> usize {
        self.inner.expiry.pending()
    }

    /// The data directory this database owns.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The configuration the database was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Advances the id counter so `last_id` is never handed out again.
    ///
    /// Used when restoring a version snapshot whose metadata recorded the
    /// source engine's last-assigned id.
    pub(crate) fn advance_id_counter(&self, last_id: RecordId) {
        self.inner.state.write().advance_past(last_id);
    }
}

impl Inner {
    /// Appends an entry under the writer lock, then applies it.
    fn append_apply(&self, log: &mut ChunkLog, entry: &LogEntry) -> StoreResult<()> {
        log.append(entry)?;
        self.state.write().apply(entry);
        Ok(())
    }

    fn insert(&self, fields: Map<String, Value>, metadata: Option<Value>) -> StoreResult<RecordId> {
        // Validate before allocating so bad input doesn't burn ids.
        for name in crate::record::RESERVED_FIELDS {
            if fields.contains_key(name) {
                return Err(StoreError::reserved_field(name));
            }
        }

        let mut log = self.log.lock();
        let id = self.state.write().allocate_id();
        let record = Record::new(id, fields, metadata)?;
        self.append_apply(&mut log, &LogEntry::Insert { data: record })?;
        Ok(id)
    }

    fn update(&self, id: RecordId, changes: Map<String, Value>) -> StoreResult<bool> {
        let mut log = self.log.lock();
        if self.state.read().get(id).is_none() {
            return Ok(false);
        }
        self.append_apply(&mut log, &LogEntry::Update { id, changes })?;
        Ok(true)
    }

    fn delete(&self, id: RecordId) -> StoreResult<bool> {
        let mut log = self.log.lock();
        if self.state.read().get(id).is_none() {
            return Ok(false);
        }
        self.append_apply(&mut log, &LogEntry::Delete { id })?;
        // A manually deleted temporary record no longer needs its timer.
        self.expiry.cancel(id);
        Ok(true)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Stop the expiry worker before the engine state goes away; pending
        // timers are cancelled rather than fired against a closing engine.
        self.inner.expiry.shutdown();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.inner.path)
            .field("records", &self.len())
            .field("next_id", &self.next_id())
            .finish_non_exhaustive()
    }
}
