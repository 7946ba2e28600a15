//! Persisted notification counter.
//!
//! The counter is a single record `{ "id": 1, "count": n }` in the
//! `notificationStore` keyspace of the `notificationDB` database. Only the
//! background worker touches it; pages keep an in-memory mirror.
//!
//! # Storage structure
//!
//! ```text
//! {data_dir}/
//!     notificationDB/
//!         notificationStore.json    # { "1": { "id": 1, "count": n } }
//! ```
//!
//! The database directory is created lazily on first access. Writes replace
//! the whole keyspace file (last writer wins) via a temp file + rename.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::constants::{COUNTER_KEYSPACE, COUNTER_RECORD_ID, DATABASE_NAME};

/// Errors from reading or writing the counter.
#[derive(Debug)]
pub enum StorageError {
    /// The underlying file system operation failed.
    Io(String),
    /// The keyspace exists but could not be decoded.
    Corrupt(String),
    /// The store refused the operation.
    Unavailable,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Storage IO failed: {msg}"),
            Self::Corrupt(msg) => write!(f, "Stored counter is corrupt: {msg}"),
            Self::Unavailable => write!(f, "Storage unavailable"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// One row of the counter keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Record key, always [`COUNTER_RECORD_ID`].
    pub id: u32,
    /// Unread notification count.
    pub count: u64,
}

/// Durable storage for the notification counter.
///
/// `get` returns 0 when nothing has been stored yet. `set` replaces the value
/// unconditionally. Failures are reported once; callers do not retry.
#[async_trait]
pub trait CounterStore: Send + Sync + std::fmt::Debug {
    /// Read the current counter value.
    async fn get(&self) -> Result<u64, StorageError>;

    /// Replace the counter value.
    async fn set(&self, count: u64) -> Result<(), StorageError>;
}

/// File-backed counter store scoped to a data directory.
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    database_dir: PathBuf,
}

impl FileCounterStore {
    /// Create a store rooted at `data_dir`. Nothing is touched on disk yet.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            database_dir: data_dir.as_ref().join(DATABASE_NAME),
        }
    }

    /// Path of the keyspace file.
    pub fn keyspace_path(&self) -> PathBuf {
        self.database_dir.join(format!("{COUNTER_KEYSPACE}.json"))
    }

    /// Create the database directory if it does not exist yet.
    async fn open(&self) -> Result<(), StorageError> {
        if !tokio::fs::try_exists(&self.database_dir).await? {
            log::debug!(
                "[Store] Creating database {}",
                self.database_dir.display()
            );
            tokio::fs::create_dir_all(&self.database_dir).await?;
        }
        Ok(())
    }

    async fn read_keyspace(&self) -> Result<BTreeMap<u32, CounterRecord>, StorageError> {
        let path = self.keyspace_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CounterStore for FileCounterStore {
    async fn get(&self) -> Result<u64, StorageError> {
        self.open().await?;
        let keyspace = self.read_keyspace().await?;
        Ok(keyspace
            .get(&COUNTER_RECORD_ID)
            .map_or(0, |record| record.count))
    }

    async fn set(&self, count: u64) -> Result<(), StorageError> {
        self.open().await?;
        // A put replaces the record; an unreadable keyspace must not block it
        let mut keyspace = match self.read_keyspace().await {
            Ok(keyspace) => keyspace,
            Err(StorageError::Corrupt(e)) => {
                log::warn!("[Store] Replacing corrupt keyspace: {e}");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        keyspace.insert(
            COUNTER_RECORD_ID,
            CounterRecord {
                id: COUNTER_RECORD_ID,
                count,
            },
        );

        let json =
            serde_json::to_vec_pretty(&keyspace).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let path = self.keyspace_path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// In-memory counter store.
///
/// Used when no durable location is wanted, and in tests where
/// [`MemoryCounterStore::set_failing`] simulates storage failures.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    count: Mutex<Option<u64>>,
    failing: AtomicBool,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `count`.
    pub fn with_count(count: u64) -> Self {
        Self {
            count: Mutex::new(Some(count)),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self) -> Result<u64, StorageError> {
        self.check()?;
        Ok(self.count.lock().await.unwrap_or(0))
    }

    async fn set(&self, count: u64) -> Result<(), StorageError> {
        self.check()?;
        *self.count.lock().await = Some(count);
        Ok(())
    }
}
