//! Queryable store of per-chunk transcript records.

use chrono::Utc;
use tracing::debug;

use crate::db::record_repo::{self, RecordRow};
use crate::db::{format_timestamp, Database};
use crate::error::AggregationError;
use crate::model::{ExecutionId, TranscriptRecord};
use crate::storage::{transcripts_prefix, ObjectStore};

pub trait ResultStore: Send + Sync {
    /// Stores one record. Writing the same job twice keeps the latest.
    fn upsert(
        &self,
        execution_id: &ExecutionId,
        record: &TranscriptRecord,
    ) -> Result<(), AggregationError>;

    /// Every record of the execution, ascending by chunk index.
    fn records_for_execution(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<TranscriptRecord>, AggregationError>;
}

/// [`ResultStore`] on the `transcript_records` table.
#[derive(Clone)]
pub struct SqliteResultStore {
    db: Database,
}

impl SqliteResultStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ResultStore for SqliteResultStore {
    fn upsert(
        &self,
        execution_id: &ExecutionId,
        record: &TranscriptRecord,
    ) -> Result<(), AggregationError> {
        let job_id = record.job_id();
        let chunk_index = match job_id.chunk_index() {
            Some(index) if job_id.belongs_to(execution_id) => index,
            _ => {
                return Err(AggregationError::MalformedRecord {
                    key: record.job_name.clone(),
                    reason: format!("job name does not belong to execution {}", execution_id),
                })
            }
        };

        let document =
            serde_json::to_string(record).map_err(|e| AggregationError::MalformedRecord {
                key: record.job_name.clone(),
                reason: e.to_string(),
            })?;

        record_repo::upsert(
            &self.db,
            &RecordRow {
                job_name: record.job_name.clone(),
                execution_id: execution_id.to_string(),
                chunk_index,
                transcript: record.text(),
                document,
                ingested_at: format_timestamp(Utc::now()),
            },
        )?;
        Ok(())
    }

    fn records_for_execution(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<TranscriptRecord>, AggregationError> {
        record_repo::find_by_execution(&self.db, execution_id.as_str())?
            .into_iter()
            .map(|row| {
                serde_json::from_str(&row.document).map_err(|e| AggregationError::MalformedRecord {
                    key: row.job_name.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

/// Loads every engine output document of the execution from the object
/// store into the result store. Safe to repeat. Returns the number of
/// documents loaded.
pub fn ingest_outputs(
    store: &dyn ResultStore,
    objects: &dyn ObjectStore,
    execution_id: &ExecutionId,
) -> Result<usize, AggregationError> {
    let keys = objects.list(&transcripts_prefix(execution_id))?;

    for key in &keys {
        let bytes = objects.get(key)?;
        let record: TranscriptRecord =
            serde_json::from_slice(&bytes).map_err(|e| AggregationError::MalformedRecord {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        store.upsert(execution_id, &record)?;
    }

    debug!(
        "Ingested {} transcript documents for execution {}",
        keys.len(),
        execution_id
    );
    Ok(keys.len())
}
