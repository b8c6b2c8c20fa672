//! redb-backed record storage.
//!
//! One database file per cache directory, `<cache_dir>/cache.redb`, with a
//! table of bincode-encoded records keyed by cache key hex.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tote_graph::cache::CACHE_FORMAT_VERSION;
use tote_graph::{CacheKey, TransformOutput};

const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("metadata");

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache miss")]
    CacheMiss,

    #[error("cache database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

impl From<redb::Error> for CacheError {
    fn from(err: redb::Error) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::DatabaseError> for CacheError {
    fn from(err: redb::DatabaseError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TableError> for CacheError {
    fn from(err: redb::TableError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TransactionError> for CacheError {
    fn from(err: redb::TransactionError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::StorageError> for CacheError {
    fn from(err: redb::StorageError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::CommitError> for CacheError {
    fn from(err: redb::CommitError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

/// A stored transform (or minify) result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub format_version: u32,
    pub output: TransformOutput,
}

impl CachedRecord {
    pub fn new(output: TransformOutput) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            output,
        }
    }
}

pub struct CacheStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Open or create the store in `cache_dir`, creating the directory too.
    pub fn open(cache_dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join("cache.redb");
        let db = Database::create(&path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(METADATA_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record stored under `key`; `CacheMiss` when there is none.
    pub fn get(&self, key: &CacheKey) -> Result<CachedRecord, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        let value = table.get(key.as_hex())?.ok_or(CacheError::CacheMiss)?;

        let record: CachedRecord = bincode::deserialize(value.value())
            .map_err(|e| CacheError::DeserializationError(e.to_string()))?;
        if record.format_version != CACHE_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                expected: CACHE_FORMAT_VERSION,
                found: record.format_version,
            });
        }
        Ok(record)
    }

    pub fn put(&self, key: &CacheKey, record: &CachedRecord) -> Result<(), CacheError> {
        let bytes =
            bincode::serialize(record).map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            table.insert(key.as_hex(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        Ok(table.iter()?.count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }
}
