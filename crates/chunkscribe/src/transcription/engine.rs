use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{ExecutionId, JobId, JobSummary};

/// Everything the engine needs to run one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRequest {
    pub job_id: JobId,
    /// Object key of the staged chunk media.
    pub media_location: String,
    /// Object key the engine writes its result document to.
    pub output_location: String,
    pub language_code: String,
}

/// The external asynchronous transcription service.
///
/// Job status is owned by the engine. Callers only submit and observe.
pub trait TranscriptionEngine: Send + Sync {
    /// Starts a job and returns without waiting for it. Submitting a job id
    /// the engine already knows must be a no-op.
    fn submit(&self, request: &TranscriptionRequest) -> Result<JobId, EngineError>;

    /// Status of every job belonging to `execution_id`. Read-only.
    fn list_jobs(&self, execution_id: &ExecutionId) -> Result<Vec<JobSummary>, EngineError>;
}
