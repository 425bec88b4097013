use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::dedup::Fingerprint;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store is closed")]
    Closed,

    #[error("corrupt entry: {0}")]
    Corrupt(String),
}

/// Persistent fingerprint -> first-seen record id mapping.
///
/// Grows monotonically: `put` never replaces an existing entry. Callers that
/// share a store across tasks must serialize check-and-insert themselves (see
/// `DuplicateDetector`).
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>, StoreError>;

    async fn put(&self, fingerprint: &Fingerprint, record_id: &str) -> Result<(), StoreError>;

    async fn len(&self) -> Result<u64, StoreError>;

    /// Flush and release the backing resources. Further calls fail.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Process-local store, lost at exit.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<Fingerprint, String>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl FingerprintStore for MemoryStore {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>, StoreError> {
        self.ensure_open()?;
        Ok(self.entries.get(fingerprint).map(|e| e.value().clone()))
    }

    async fn put(&self, fingerprint: &Fingerprint, record_id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.entries
            .entry(*fingerprint)
            .or_insert_with(|| record_id.to_string());
        Ok(())
    }

    async fn len(&self) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self.entries.len() as u64)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fingerprints (
    digest    BLOB PRIMARY KEY NOT NULL,
    record_id TEXT NOT NULL
) WITHOUT ROWID
"#;

/// SQLite-backed store, reusable across runs.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the store file at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let store = Self::connect(options).await?;
        info!("opened fingerprint store with {} entries", store.len().await?);
        Ok(store)
    }

    /// Store living only as long as this value.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        // one connection: single writer, and an in-memory database must not
        // be dropped by the pool reaping idle connections
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl FingerprintStore for SqliteStore {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>, StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        let record_id: Option<String> =
            sqlx::query_scalar("SELECT record_id FROM fingerprints WHERE digest = ?1")
                .bind(fingerprint.as_bytes().as_slice())
                .fetch_optional(&self.pool)
                .await?;
        Ok(record_id)
    }

    async fn put(&self, fingerprint: &Fingerprint, record_id: &str) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        sqlx::query("INSERT OR IGNORE INTO fingerprints (digest, record_id) VALUES (?1, ?2)")
            .bind(fingerprint.as_bytes().as_slice())
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn len(&self) -> Result<u64, StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fingerprints")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("negative count {count}")))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        debug!("fingerprint store closed");
        Ok(())
    }
}
