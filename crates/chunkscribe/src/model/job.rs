//! Transcription jobs and their deterministic identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::execution::ExecutionId;

const CHUNK_DELIMITER: &str = "_chunk_";

/// Identifier of the external job submitted for one chunk.
///
/// A pure function of `(execution_id, chunk index)`: resubmitting the same
/// chunk always names the same job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn for_chunk(execution_id: &ExecutionId, index: u32) -> Self {
        Self(format!("{}{}{:05}", execution_id, CHUNK_DELIMITER, index))
    }

    /// Wraps a job name reported by the engine without validating it.
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The chunk index embedded in the id, if it has the expected shape.
    pub fn chunk_index(&self) -> Option<u32> {
        let (_, index) = self.0.rsplit_once(CHUNK_DELIMITER)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        index.parse().ok()
    }

    /// True when this job was derived from `execution_id`. Compares the full
    /// prefix up to the delimiter so ids sharing a textual prefix never match.
    pub fn belongs_to(&self, execution_id: &ExecutionId) -> bool {
        self.0
            .strip_prefix(execution_id.as_str())
            .is_some_and(|rest| rest.starts_with(CHUNK_DELIMITER))
            && self.chunk_index().is_some()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of an external job. Owned by the engine; only observed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the engine's job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// A job submitted for a chunk, as recorded by the submit stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJob {
    pub job_id: JobId,
    pub chunk_index: u32,
    pub media_location: String,
    pub output_location: String,
    pub status: JobStatus,
}
