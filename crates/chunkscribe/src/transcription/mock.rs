//! Deterministic in-process stand-in for the transcription service.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::engine::{TranscriptionEngine, TranscriptionRequest};
use crate::error::EngineError;
use crate::model::{ExecutionId, JobId, JobStatus, JobSummary, TranscriptRecord};
use crate::storage::ObjectStore;

struct MockJob {
    request: TranscriptionRequest,
    status: JobStatus,
    checks: u32,
}

#[derive(Default)]
struct MockState {
    jobs: BTreeMap<JobId, MockJob>,
    list_calls: u32,
    duplicate_submissions: u32,
}

/// Simulates the engine against an [`ObjectStore`].
///
/// A job moves to `succeeded` on the status check that brings its check
/// count to `checks_to_complete`, at which point its result document is
/// written to the job's output location.
pub struct MockEngine {
    store: Arc<dyn ObjectStore>,
    checks_to_complete: u32,
    unavailable_checks: u32,
    failing_chunks: BTreeSet<u32>,
    rejected_chunks: BTreeSet<u32>,
    transcripts: HashMap<u32, String>,
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            checks_to_complete: 1,
            unavailable_checks: 0,
            failing_chunks: BTreeSet::new(),
            rejected_chunks: BTreeSet::new(),
            transcripts: HashMap::new(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Number of status checks a job needs before it finishes.
    pub fn with_checks_to_complete(mut self, checks: u32) -> Self {
        self.checks_to_complete = checks;
        self
    }

    /// Makes the first `count` `list_jobs` calls fail as unavailable.
    pub fn with_unavailable_checks(mut self, count: u32) -> Self {
        self.unavailable_checks = count;
        self
    }

    /// Jobs for these chunk indices finish as `failed` with no output.
    pub fn with_failing_chunks(mut self, indices: &[u32]) -> Self {
        self.failing_chunks.extend(indices.iter().copied());
        self
    }

    /// Submissions for these chunk indices are refused with a quota error.
    pub fn with_rejected_chunks(mut self, indices: &[u32]) -> Self {
        self.rejected_chunks.extend(indices.iter().copied());
        self
    }

    pub fn with_transcript(mut self, index: u32, text: &str) -> Self {
        self.transcripts.insert(index, text.to_string());
        self
    }

    pub fn submitted_job_ids(&self) -> Vec<JobId> {
        self.lock()
            .map(|state| state.jobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn duplicate_submissions(&self) -> u32 {
        self.lock().map(|s| s.duplicate_submissions).unwrap_or(0)
    }

    pub fn list_calls(&self) -> u32 {
        self.lock().map(|s| s.list_calls).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Unavailable("engine state poisoned".to_string()))
    }

    fn transcript_for(&self, index: u32) -> String {
        self.transcripts
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("transcript {}", index))
    }

    fn finish(&self, job: &mut MockJob) -> Result<(), EngineError> {
        let index = job.request.job_id.chunk_index().unwrap_or_default();
        if self.failing_chunks.contains(&index) {
            job.status = JobStatus::Failed;
            return Ok(());
        }

        let record = TranscriptRecord::new(&job.request.job_id, &self.transcript_for(index));
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| EngineError::Unavailable(format!("cannot encode result: {}", e)))?;
        self.store
            .put(&job.request.output_location, &bytes)
            .map_err(|e| EngineError::Unavailable(format!("cannot write result: {}", e)))?;
        job.status = JobStatus::Succeeded;
        Ok(())
    }
}

impl TranscriptionEngine for MockEngine {
    fn submit(&self, request: &TranscriptionRequest) -> Result<JobId, EngineError> {
        if request.language_code.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "language code is required".to_string(),
            ));
        }
        let media_exists = self
            .store
            .head(&request.media_location)
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
        if !media_exists {
            return Err(EngineError::InvalidRequest(format!(
                "media '{}' does not exist",
                request.media_location
            )));
        }
        if let Some(index) = request.job_id.chunk_index() {
            if self.rejected_chunks.contains(&index) {
                return Err(EngineError::QuotaExceeded(format!(
                    "job '{}' refused",
                    request.job_id
                )));
            }
        }

        let mut state = self.lock()?;
        if state.jobs.contains_key(&request.job_id) {
            state.duplicate_submissions += 1;
            debug!("Job {} already known, ignoring resubmission", request.job_id);
            return Ok(request.job_id.clone());
        }
        state.jobs.insert(
            request.job_id.clone(),
            MockJob {
                request: request.clone(),
                status: JobStatus::Pending,
                checks: 0,
            },
        );
        Ok(request.job_id.clone())
    }

    fn list_jobs(&self, execution_id: &ExecutionId) -> Result<Vec<JobSummary>, EngineError> {
        let mut state = self.lock()?;
        state.list_calls += 1;
        if state.list_calls <= self.unavailable_checks {
            return Err(EngineError::Unavailable(format!(
                "status check {} refused",
                state.list_calls
            )));
        }

        let mut summaries = Vec::new();
        for (job_id, job) in state.jobs.iter_mut() {
            if !job_id.belongs_to(execution_id) {
                continue;
            }
            if !job.status.is_terminal() {
                job.checks += 1;
                if job.checks >= self.checks_to_complete {
                    self.finish(job)?;
                } else {
                    job.status = JobStatus::Running;
                }
            }
            summaries.push(JobSummary {
                job_id: job_id.clone(),
                status: job.status,
            });
        }
        Ok(summaries)
    }
}
