//! Chunk job repository: one row per chunk of an execution, keyed by job id.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

pub const STAGE_SUBMITTED: &str = "submitted";
pub const STAGE_FAILED: &str = "failed";

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkJobRow {
    pub job_id: String,
    pub execution_id: String,
    pub chunk_index: u32,
    pub start_offset: f64,
    pub duration: f64,
    pub media_location: Option<String>,
    pub output_location: Option<String>,
    /// Outcome of the worker pipeline: `submitted` or `failed`.
    pub stage_status: String,
    /// Last status the engine reported for this job.
    pub engine_status: Option<String>,
    pub error: Option<String>,
    pub updated_at: String,
}

impl ChunkJobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_id: row.get("job_id")?,
            execution_id: row.get("execution_id")?,
            chunk_index: row.get("chunk_index")?,
            start_offset: row.get("start_offset")?,
            duration: row.get("duration")?,
            media_location: row.get("media_location")?,
            output_location: row.get("output_location")?,
            stage_status: row.get("stage_status")?,
            engine_status: row.get("engine_status")?,
            error: row.get("error")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts or replaces the row for a job. Re-running a chunk overwrites its
/// previous outcome.
pub fn upsert(db: &Database, job: &ChunkJobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO chunk_jobs (job_id, execution_id, chunk_index, start_offset, duration,
             media_location, output_location, stage_status, engine_status, error, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(job_id) DO UPDATE SET
                start_offset=excluded.start_offset, duration=excluded.duration,
                media_location=excluded.media_location,
                output_location=excluded.output_location,
                stage_status=excluded.stage_status, engine_status=excluded.engine_status,
                error=excluded.error, updated_at=excluded.updated_at",
            params![
                job.job_id,
                job.execution_id,
                job.chunk_index,
                job.start_offset,
                job.duration,
                job.media_location,
                job.output_location,
                job.stage_status,
                job.engine_status,
                job.error,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_execution(
    db: &Database,
    execution_id: &str,
) -> Result<Vec<ChunkJobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM chunk_jobs WHERE execution_id = ?1 ORDER BY chunk_index ASC",
        )?;
        let rows = stmt
            .query_map(params![execution_id], ChunkJobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Records the status the engine last reported for a job.
pub fn update_engine_status(
    db: &Database,
    job_id: &str,
    engine_status: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE chunk_jobs SET engine_status = ?2, updated_at = ?3 WHERE job_id = ?1",
            params![job_id, engine_status, updated_at],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::execution_repo::{self, ExecutionRow};

    fn test_db() -> Database {
        let db = Database::open_in_memory().expect("Failed to create test database");
        execution_repo::try_insert(
            &db,
            &ExecutionRow {
                id: "e1".to_string(),
                source_file_ref: "movie.mp4".to_string(),
                phase: "fanning_out".to_string(),
                chunk_count: Some(2),
                failed_chunks: None,
                poll_attempts: 0,
                next_check_at: None,
                result_key: None,
                error: None,
                started_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
                completed_at: None,
            },
        )
        .unwrap();
        db
    }

    fn sample(index: u32, stage_status: &str) -> ChunkJobRow {
        ChunkJobRow {
            job_id: format!("e1_chunk_{:05}", index),
            execution_id: "e1".to_string(),
            chunk_index: index,
            start_offset: f64::from(index) * 30.0,
            duration: 30.0,
            media_location: Some(format!("e1/{}", index)),
            output_location: Some(format!("e1/transcripts/{}.json", index)),
            stage_status: stage_status.to_string(),
            engine_status: None,
            error: None,
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_upsert_overwrites_same_job() {
        let db = test_db();
        let mut failed = sample(1, STAGE_FAILED);
        failed.error = Some("extract failed".to_string());
        upsert(&db, &failed).unwrap();
        upsert(&db, &sample(1, STAGE_SUBMITTED)).unwrap();
        upsert(&db, &sample(0, STAGE_SUBMITTED)).unwrap();

        let rows = find_by_execution(&db, "e1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].chunk_index, 0);
        assert_eq!(rows[1].stage_status, STAGE_SUBMITTED);
        assert_eq!(rows[1].error, None);
    }

    #[test]
    fn test_update_engine_status() {
        let db = test_db();
        upsert(&db, &sample(0, STAGE_SUBMITTED)).unwrap();
        update_engine_status(&db, "e1_chunk_00000", "running", "2026-01-01T00:01:00.000Z")
            .unwrap();

        let rows = find_by_execution(&db, "e1").unwrap();
        assert_eq!(rows[0].engine_status.as_deref(), Some("running"));
    }

    #[test]
    fn test_requires_existing_execution() {
        let db = Database::open_in_memory().unwrap();
        assert!(upsert(&db, &sample(0, STAGE_SUBMITTED)).is_err());
    }
}
