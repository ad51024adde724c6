//! Key/value storage contracts and implementations.
//!
//! # Responsibility
//! - Define the minimal durable-store surface the persistence adapter needs.
//! - Provide a SQLite-backed store and an in-memory store.
//!
//! # Invariants
//! - `put` fully replaces the value stored under a key.
//! - Implementations are shareable across threads.

use crate::db::{open_db, open_db_in_memory, DbError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub type KvResult<T> = Result<T, KvError>;

/// Errors from key/value storage backends.
#[derive(Debug)]
pub enum KvError {
    Db(DbError),
    /// A previous holder of the store lock panicked.
    Poisoned,
    /// The backend could not serve the read.
    ReadRejected(String),
    /// The backend refused the write (quota, read-only medium, ...).
    WriteRejected(String),
    /// Connection was not prepared by `open_db`.
    MissingTable(&'static str),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Poisoned => write!(f, "key/value store lock is poisoned"),
            Self::ReadRejected(reason) => write!(f, "read rejected: {reason}"),
            Self::WriteRejected(reason) => write!(f, "write rejected: {reason}"),
            Self::MissingTable(table) => write!(f, "key/value store requires table `{table}`"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Query(value))
    }
}

/// External durable store addressed by string keys.
pub trait KvStore: Send + Sync {
    /// Reads the raw value for `key`, `None` when absent.
    fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Writes the raw value for `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> KvResult<()>;
}

/// `kv_entries` table in a migrated SQLite database.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection) -> KvResult<Self> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries';",
                [],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(KvError::MissingTable("kv_entries"));
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens the database file at `path`, migrating it first.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> KvResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| KvError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> KvResult<()> {
        let conn = self.conn.lock().map_err(|_| KvError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at;",
            params![key, value, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}

/// Process-local store, mainly for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
    reject_reads: AtomicBool,
    reject_writes: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `get` fail until switched back.
    pub fn set_reject_reads(&self, reject: bool) {
        self.reject_reads.store(reject, Ordering::SeqCst);
    }

    /// Makes every subsequent `put` fail until switched back.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Current keys in sorted order.
    pub fn keys(&self) -> KvResult<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| KvError::Poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        if self.reject_reads.load(Ordering::SeqCst) {
            return Err(KvError::ReadRejected("medium unavailable".to_string()));
        }
        let entries = self.entries.lock().map_err(|_| KvError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> KvResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(KvError::WriteRejected("quota exceeded".to_string()));
        }
        let mut entries = self.entries.lock().map_err(|_| KvError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).put(key, value)
    }
}
