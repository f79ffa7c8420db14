//! Execution repository: persisted orchestrator state for the `executions` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw execution row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRow {
    pub id: String,
    pub source_file_ref: String,
    pub phase: String,
    pub chunk_count: Option<u32>,
    /// JSON array of chunk indices whose pipeline failed.
    pub failed_chunks: Option<String>,
    pub poll_attempts: u32,
    pub next_check_at: Option<String>,
    pub result_key: Option<String>,
    pub error: Option<String>,
    pub started_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl ExecutionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            source_file_ref: row.get("source_file_ref")?,
            phase: row.get("phase")?,
            chunk_count: row.get("chunk_count")?,
            failed_chunks: row.get("failed_chunks")?,
            poll_attempts: row.get("poll_attempts")?,
            next_check_at: row.get("next_check_at")?,
            result_key: row.get("result_key")?,
            error: row.get("error")?,
            started_at: row.get("started_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Inserts a new execution. Returns `false` without touching the existing
/// row when the id is already taken.
pub fn try_insert(db: &Database, execution: &ExecutionRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO executions (id, source_file_ref, phase, chunk_count,
             failed_chunks, poll_attempts, next_check_at, result_key, error, started_at,
             updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                execution.id,
                execution.source_file_ref,
                execution.phase,
                execution.chunk_count,
                execution.failed_chunks,
                execution.poll_attempts,
                execution.next_check_at,
                execution.result_key,
                execution.error,
                execution.started_at,
                execution.updated_at,
                execution.completed_at,
            ],
        )?;
        Ok(inserted == 1)
    })
}

/// Overwrites every column except `id`, `source_file_ref` and `started_at`.
pub fn update(db: &Database, execution: &ExecutionRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE executions SET phase=?2, chunk_count=?3, failed_chunks=?4,
             poll_attempts=?5, next_check_at=?6, result_key=?7, error=?8, updated_at=?9,
             completed_at=?10
             WHERE id=?1",
            params![
                execution.id,
                execution.phase,
                execution.chunk_count,
                execution.failed_chunks,
                execution.poll_attempts,
                execution.next_check_at,
                execution.result_key,
                execution.error,
                execution.updated_at,
                execution.completed_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ExecutionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM executions WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], ExecutionRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Executions in `phase` whose next check is due at or before `now`,
/// oldest first.
pub fn find_due(db: &Database, phase: &str, now: &str) -> Result<Vec<ExecutionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM executions
             WHERE phase = ?1 AND next_check_at IS NOT NULL AND next_check_at <= ?2
             ORDER BY next_check_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![phase, now], ExecutionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_by_phases(db: &Database, phases: &[&str]) -> Result<Vec<ExecutionRow>, DatabaseError> {
    if phases.is_empty() {
        return Ok(Vec::new());
    }
    db.with_conn(|conn| {
        let placeholders: Vec<String> = (1..=phases.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT * FROM executions WHERE phase IN ({}) ORDER BY started_at ASC, id ASC",
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(phases.iter()), ExecutionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count_by_phase(db: &Database, phase: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM executions WHERE phase = ?1",
            params![phase],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
