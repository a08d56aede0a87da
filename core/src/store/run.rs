//! Run lifecycle and the commit protocol.
//!
//! COMMIT PROTOCOL (fixed, never reordered), all inside one IMMEDIATE
//! transaction that doubles as the single-writer lock:
//!   1. Begin the transaction; a busy database means another writer holds it.
//!   2. Allocate the next run_id and insert the run as `in_progress`.
//!   3. Under a savepoint, write the whole snapshot and mark the run
//!      `success` with records_loaded and execution_time.
//!   4. Failure: roll back to the savepoint, mark the run `failed` with the
//!      error detail.
//!   5. Commit. Other connections only ever see `success` with its rows, or
//!      `failed` with none. A crash before this point leaves no trace.

use super::{snapshot::insert_snapshot_rows, SnapshotStore};
use crate::{
    error::{PipelineError, PipelineResult},
    snapshot::{RunManifest, Snapshot},
    types::{RunId, RunStatus},
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One row of the run audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRun {
    pub run_id: RunId,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub source: String,
    pub status: RunStatus,
    pub records_extracted: i64,
    pub records_rejected: i64,
    pub records_loaded: i64,
    pub execution_time: Option<f64>,
    pub error_detail: Option<String>,
}

const RUN_COLUMNS: &str = "run_id, created_at, completed_at, source, status,
    records_extracted, records_rejected, records_loaded, execution_time, error_detail";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<PipelineRun> {
    let status: String = row.get(4)?;
    Ok(PipelineRun {
        run_id: row.get(0)?,
        created_at: row.get(1)?,
        completed_at: row.get(2)?,
        source: row.get(3)?,
        status: RunStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown run status '{status}'").into(),
            )
        })?,
        records_extracted: row.get(5)?,
        records_rejected: row.get(6)?,
        records_loaded: row.get(7)?,
        execution_time: row.get(8)?,
        error_detail: row.get(9)?,
    })
}

/// Allocate a run_id and record the run as in progress.
fn insert_run(conn: &Connection, manifest: &RunManifest) -> rusqlite::Result<RunId> {
    conn.execute(
        "INSERT INTO pipeline_runs
            (created_at, source, status, records_extracted, records_rejected)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            chrono::Utc::now().to_rfc3339(),
            manifest.source,
            RunStatus::InProgress.as_str(),
            manifest.records_extracted as i64,
            manifest.records_rejected as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn mark_run_succeeded(
    conn: &Connection,
    run_id: RunId,
    records_loaded: usize,
    elapsed: f64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE pipeline_runs
         SET status = ?1, records_loaded = ?2, execution_time = ?3, completed_at = ?4
         WHERE run_id = ?5",
        params![
            RunStatus::Success.as_str(),
            records_loaded as i64,
            elapsed,
            chrono::Utc::now().to_rfc3339(),
            run_id,
        ],
    )?;
    Ok(())
}

fn mark_run_failed(conn: &Connection, run_id: RunId, elapsed: f64, detail: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE pipeline_runs
         SET status = ?1, records_loaded = 0, execution_time = ?2, completed_at = ?3,
             error_detail = ?4
         WHERE run_id = ?5",
        params![
            RunStatus::Failed.as_str(),
            elapsed,
            chrono::Utc::now().to_rfc3339(),
            detail,
            run_id,
        ],
    )?;
    Ok(())
}

/// Snapshot rows and the success mark, all or nothing. Returns the
/// execution time recorded on the run.
fn write_and_seal(
    tx: &mut Transaction<'_>,
    run_id: RunId,
    snapshot: &Snapshot,
    started: Instant,
) -> rusqlite::Result<f64> {
    let sp = tx.savepoint()?;
    insert_snapshot_rows(&sp, run_id, snapshot)?;
    let elapsed = started.elapsed().as_secs_f64();
    mark_run_succeeded(&sp, run_id, snapshot.record_count(), elapsed)?;
    sp.commit()?;
    Ok(elapsed)
}

impl SnapshotStore {
    /// Commit a computed snapshot as a new run and return its run_id.
    ///
    /// - `started`: when the pipeline execution began; execution_time is
    ///   measured from here.
    ///
    /// On a write failure nothing from the snapshot is visible, the run is
    /// kept as `failed`, and `PipelineError::Persistence` carries the run_id.
    pub fn commit(
        &mut self,
        manifest: &RunManifest,
        snapshot: &Snapshot,
        started: Instant,
    ) -> PipelineResult<RunId> {
        let mut lock = self.acquire_commit_lock()?;
        let run_id = insert_run(lock.transaction(), manifest)?;
        log::info!(
            "run={run_id} committing {} record(s) from {}",
            snapshot.record_count(),
            manifest.source
        );

        match write_and_seal(lock.transaction(), run_id, snapshot, started) {
            Ok(elapsed) => {
                lock.finish()
                    .map_err(|source| PipelineError::Persistence { run_id, source })?;
                log::info!("run={run_id} success in {elapsed:.3}s");
                Ok(run_id)
            }
            Err(source) => {
                let elapsed = started.elapsed().as_secs_f64();
                log::warn!("run={run_id} failed, snapshot rolled back: {source}");
                let recorded = mark_run_failed(lock.transaction(), run_id, elapsed, &source.to_string())
                    .and_then(|()| lock.finish());
                if let Err(e) = recorded {
                    log::error!("run={run_id} could not be marked failed: {e}");
                }
                Err(PipelineError::Persistence { run_id, source })
            }
        }
    }

    // ── Audit trail ────────────────────────────────────────────

    pub fn run(&self, run_id: RunId) -> PipelineResult<Option<PipelineRun>> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE run_id = ?1");
        let run = self
            .conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?;
        Ok(run)
    }

    /// Every run ever recorded, oldest first.
    pub fn runs(&self) -> PipelineResult<Vec<PipelineRun>> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM pipeline_runs ORDER BY run_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// The most recent successful run, or None if no run has succeeded.
    pub fn latest_run_id(&self) -> PipelineResult<Option<RunId>> {
        let run_id: Option<RunId> = self
            .conn
            .query_row("SELECT run_id FROM latest_successful_run", [], |row| row.get(0))?;
        Ok(run_id)
    }
}
