//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The pure stages (feature engineering, scoring, aggregation) never see a
//! connection; they hand a finished Snapshot to `SnapshotStore::commit`.

mod latest;
mod run;
mod snapshot;

pub use run::PipelineRun;

use crate::error::{PipelineError, PipelineResult};
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::time::Duration;

pub struct SnapshotStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl SnapshotStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| PipelineError::Configuration(format!("Cannot open store {path}: {e}")))?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> PipelineResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_pipeline_runs.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_snapshot.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_latest_views.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_risk_distribution.sql"))?;
        Ok(())
    }

    /// Wait at most `timeout` for a lock held by another connection.
    pub fn set_busy_timeout(&self, timeout: Duration) -> PipelineResult<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Take the single-writer commit lock. Fails with `LockHeld` once the busy
    /// timeout expires while another connection holds it.
    pub fn acquire_commit_lock(&mut self) -> PipelineResult<CommitLock<'_>> {
        let store = self.path.clone().unwrap_or_else(|| ":memory:".into());
        match self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
        {
            Ok(tx) => {
                log::debug!("Commit lock acquired on {store}");
                Ok(CommitLock { tx })
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                Err(PipelineError::LockHeld { store })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The commit lock is SQLite's own write lock, held by an open IMMEDIATE
/// transaction. Dropping the guard rolls it back; if the process dies, SQLite
/// discards the transaction and the lock with it.
pub struct CommitLock<'a> {
    tx: Transaction<'a>,
}

impl<'a> CommitLock<'a> {
    pub(crate) fn transaction(&mut self) -> &mut Transaction<'a> {
        &mut self.tx
    }

    pub(crate) fn finish(self) -> rusqlite::Result<()> {
        self.tx.commit()
    }
}
