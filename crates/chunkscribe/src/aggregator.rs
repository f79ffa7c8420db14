//! Ordered aggregation of per-chunk transcripts into the final artifact.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AggregationError;
use crate::model::{ExecutionId, TranscriptRecord};
use crate::results::{ingest_outputs, ResultStore};
use crate::storage::{result_key, ObjectStore};

/// What a successful aggregation wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub result_key: String,
    pub chunk_count: u32,
    pub transcript: String,
}

pub struct OrderedAggregator {
    results: Arc<dyn ResultStore>,
    objects: Arc<dyn ObjectStore>,
    separator: String,
}

impl OrderedAggregator {
    pub fn new(results: Arc<dyn ResultStore>, objects: Arc<dyn ObjectStore>, separator: &str) -> Self {
        Self {
            results,
            objects,
            separator: separator.to_string(),
        }
    }

    /// Collects the execution's records, checks that exactly `expected`
    /// chunks `0..expected` are present, and writes their texts joined in
    /// chunk order to `{executionId}/result`.
    ///
    /// On `AggregationIncomplete` nothing is written.
    pub fn aggregate(
        &self,
        execution_id: &ExecutionId,
        expected: u32,
    ) -> Result<AggregateOutcome, AggregationError> {
        ingest_outputs(self.results.as_ref(), self.objects.as_ref(), execution_id)?;
        let records = self.results.records_for_execution(execution_id)?;

        let transcript = assemble(execution_id, &records, expected, &self.separator)?;

        let key = result_key(execution_id);
        self.objects.put(&key, transcript.as_bytes())?;

        info!(
            "Wrote transcript of {} chunks for execution {} to {}",
            expected, execution_id, key
        );
        Ok(AggregateOutcome {
            result_key: key,
            chunk_count: expected,
            transcript,
        })
    }
}

/// Joins record texts by chunk index after the integrity check.
fn assemble(
    execution_id: &ExecutionId,
    records: &[TranscriptRecord],
    expected: u32,
    separator: &str,
) -> Result<String, AggregationError> {
    let mut by_index: BTreeMap<u32, String> = BTreeMap::new();
    for record in records {
        match record.chunk_index() {
            Some(index) => {
                by_index.insert(index, record.text());
            }
            None => warn!("Skipping record with unparsable job name '{}'", record.job_name),
        }
    }

    let missing: Vec<u32> = (0..expected).filter(|i| !by_index.contains_key(i)).collect();
    let found = u32::try_from(by_index.len()).unwrap_or(u32::MAX);
    if !missing.is_empty() || found != expected {
        return Err(AggregationError::AggregationIncomplete {
            execution_id: execution_id.to_string(),
            expected,
            found,
            missing,
        });
    }

    Ok(by_index
        .into_values()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(separator))
}
