//! Persisted execution state and its mapping to the `executions` table.

use chrono::{DateTime, Utc};

use crate::db::execution_repo::ExecutionRow;
use crate::db::{format_timestamp, parse_timestamp};
use crate::model::{Execution, ExecutionId, ExecutionPhase};

use super::error::OrchestratorError;

/// Everything the orchestrator knows about one execution between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub execution: Execution,
    pub phase: ExecutionPhase,
    /// Set once planning succeeds.
    pub chunk_count: Option<u32>,
    /// Gap list: chunks whose pipeline or aggregation record is missing.
    pub failed_chunks: Vec<u32>,
    /// Checks that found the execution not done yet.
    pub poll_attempts: u32,
    pub next_check_at: Option<DateTime<Utc>>,
    pub result_key: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    pub fn new(execution: Execution) -> Self {
        let now = execution.started_at;
        Self {
            execution,
            phase: ExecutionPhase::Planning,
            chunk_count: None,
            failed_chunks: Vec::new(),
            poll_attempts: 0,
            next_check_at: None,
            result_key: None,
            error: None,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution.execution_id
    }

    /// Moves to `next`, refusing steps the lifecycle does not allow.
    pub fn advance(
        &mut self,
        next: ExecutionPhase,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        if !self.phase.can_transition_to(next) {
            return Err(OrchestratorError::InvalidTransition {
                execution_id: self.execution_id().to_string(),
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        self.phase = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
            self.next_check_at = None;
        }
        Ok(())
    }

    pub fn to_row(&self) -> Result<ExecutionRow, OrchestratorError> {
        let failed_chunks = if self.failed_chunks.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&self.failed_chunks).map_err(|e| {
                OrchestratorError::CorruptState {
                    execution_id: self.execution_id().to_string(),
                    reason: e.to_string(),
                }
            })?)
        };

        Ok(ExecutionRow {
            id: self.execution_id().to_string(),
            source_file_ref: self.execution.source_file_ref.clone(),
            phase: self.phase.as_str().to_string(),
            chunk_count: self.chunk_count,
            failed_chunks,
            poll_attempts: self.poll_attempts,
            next_check_at: self.next_check_at.map(format_timestamp),
            result_key: self.result_key.clone(),
            error: self.error.clone(),
            started_at: format_timestamp(self.execution.started_at),
            updated_at: format_timestamp(self.updated_at),
            completed_at: self.completed_at.map(format_timestamp),
        })
    }

    pub fn from_row(row: ExecutionRow) -> Result<Self, OrchestratorError> {
        let corrupt = |reason: String| OrchestratorError::CorruptState {
            execution_id: row.id.clone(),
            reason,
        };

        let execution_id = ExecutionId::parse(&row.id).map_err(|e| corrupt(e.to_string()))?;
        let phase = row.phase.parse::<ExecutionPhase>().map_err(corrupt)?;
        let failed_chunks = match row.failed_chunks.as_deref() {
            Some(json) => serde_json::from_str::<Vec<u32>>(json)
                .map_err(|e| corrupt(format!("failed_chunks: {}", e)))?,
            None => Vec::new(),
        };
        let started_at = parse_timestamp(&row.started_at, "started_at")?;
        let updated_at = parse_timestamp(&row.updated_at, "updated_at")?;
        let next_check_at = row
            .next_check_at
            .as_deref()
            .map(|s| parse_timestamp(s, "next_check_at"))
            .transpose()?;
        let completed_at = row
            .completed_at
            .as_deref()
            .map(|s| parse_timestamp(s, "completed_at"))
            .transpose()?;

        Ok(Self {
            execution: Execution::new(execution_id, &row.source_file_ref, started_at),
            phase,
            chunk_count: row.chunk_count,
            failed_chunks,
            poll_attempts: row.poll_attempts,
            next_check_at,
            result_key: row.result_key,
            error: row.error,
            updated_at,
            completed_at,
        })
    }
}
