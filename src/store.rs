//! Persistent state store for the single run record.
//!
//! Exactly one [`RunState`] exists process-wide; it is kept as a single
//! key/value row in SQLite so it survives process restarts. Every write
//! notifies subscribers through a watch channel, and all pipeline
//! mutations go through [`StateStore::update`] so each write is derived
//! from a freshly read snapshot rather than a stale in-memory copy.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::watch;

use crate::error::{Result, StoreError};
use crate::types::RunState;

/// Key of the single run record in the `run_state` table
const STATE_KEY: &str = "current";

/// Durable store for the run state, with change notification
pub struct StateStore {
    /// SQLite connection pool
    pool: SqlitePool,
    /// Change notification channel, fired on every successful set
    notify: watch::Sender<RunState>,
    /// Serializes read-modify-write cycles in [`StateStore::update`]
    write_lock: tokio::sync::Mutex<()>,
}

impl StateStore {
    /// Open (or create) the state database at the given path
    ///
    /// Creates the parent directory and the schema if missing. The
    /// database uses WAL journaling so an interrupted write never
    /// corrupts the previous checkpoint.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::ConnectionFailed(format!("failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("failed to parse database path: {}", e))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            StoreError::ConnectionFailed(format!("failed to connect to database: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS run_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("failed to create run_state table: {}", e))
        })?;

        let initial = load(&pool).await?;
        let (notify, _rx) = watch::channel(initial);

        Ok(Self {
            pool,
            notify,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Read the current run state
    ///
    /// Returns `RunState::default()` (status `idle`, empty items and
    /// log) when nothing has been persisted yet.
    pub async fn get(&self) -> Result<RunState> {
        load(&self.pool).await
    }

    /// Overwrite the run state and notify subscribers
    pub async fn set(&self, state: &RunState) -> Result<()> {
        let raw = serde_json::to_string(state)
            .map_err(|e| StoreError::Corrupted(format!("failed to encode run state: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO run_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(STATE_KEY)
        .bind(raw)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("failed to persist run state: {}", e)))?;

        self.notify.send_replace(state.clone());
        Ok(())
    }

    /// Apply a mutation to a freshly read snapshot and persist the result
    ///
    /// This is the read-modify-write primitive the pipeline uses for
    /// every write: it re-reads the latest stored record, applies the
    /// mutation, refreshes `last_updated_at` (never moving it
    /// backwards), and persists. Cycles are serialized by an internal
    /// lock so interleaved callers cannot clobber each other.
    pub async fn update<F>(&self, apply: F) -> Result<RunState>
    where
        F: FnOnce(&mut RunState) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut state = self.get().await?;
        let previous = state.last_updated_at;
        apply(&mut state);
        state.last_updated_at = previous.max(chrono::Utc::now().timestamp_millis());
        self.set(&state).await?;
        Ok(state)
    }

    /// Subscribe to run state changes
    ///
    /// The receiver yields the current state immediately and fires on
    /// every successful [`StateStore::set`]. Multiple subscribers are
    /// supported.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.notify.subscribe()
    }
}

/// Load the persisted record, falling back to the documented default
async fn load(pool: &SqlitePool) -> Result<RunState> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM run_state WHERE key = ?")
        .bind(STATE_KEY)
        .fetch_optional(pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("failed to read run state: {}", e)))?;

    match value {
        None => Ok(RunState::default()),
        Some(raw) => Ok(serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupted(format!("failed to decode run state: {}", e)))?),
    }
}
