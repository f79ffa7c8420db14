//! Transcript record repository backing the queryable result store.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub job_name: String,
    pub execution_id: String,
    pub chunk_index: u32,
    pub transcript: String,
    /// The record as received, serialized JSON.
    pub document: String,
    pub ingested_at: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_name: row.get("job_name")?,
            execution_id: row.get("execution_id")?,
            chunk_index: row.get("chunk_index")?,
            transcript: row.get("transcript")?,
            document: row.get("document")?,
            ingested_at: row.get("ingested_at")?,
        })
    }
}

/// Writes a record; a second write for the same job name replaces the first.
pub fn upsert(db: &Database, record: &RecordRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO transcript_records (job_name, execution_id, chunk_index, transcript,
             document, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(job_name) DO UPDATE SET
                execution_id=excluded.execution_id, chunk_index=excluded.chunk_index,
                transcript=excluded.transcript, document=excluded.document,
                ingested_at=excluded.ingested_at",
            params![
                record.job_name,
                record.execution_id,
                record.chunk_index,
                record.transcript,
                record.document,
                record.ingested_at,
            ],
        )?;
        Ok(())
    })
}

/// All records of an execution ordered by chunk index.
pub fn find_by_execution(db: &Database, execution_id: &str) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM transcript_records WHERE execution_id = ?1
             ORDER BY chunk_index ASC",
        )?;
        let rows = stmt
            .query_map(params![execution_id], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
