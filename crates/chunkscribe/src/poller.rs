//! Completion polling: a read-only status check plus the explicit state
//! machine that the scheduler drives between ticks.

use std::sync::Arc;

use tracing::debug;

use crate::error::PollError;
use crate::model::{ExecutionId, JobStatus, JobSummary};
use crate::transcription::TranscriptionEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Waiting,
    Checking,
    AllDone,
    NotDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// The fixed delay after the last check has passed.
    DelayElapsed,
    /// A status check finished; `true` when every job is terminal.
    CheckCompleted(bool),
    /// The engine could not be queried. Treated like "not done yet".
    CheckFailed,
    /// The next check has been scheduled.
    Rescheduled,
}

impl PollState {
    /// Next state, or `None` when `event` is not valid in this state.
    pub fn transition(self, event: PollEvent) -> Option<PollState> {
        match (self, event) {
            (PollState::Waiting, PollEvent::DelayElapsed) => Some(PollState::Checking),
            (PollState::Checking, PollEvent::CheckCompleted(true)) => Some(PollState::AllDone),
            (PollState::Checking, PollEvent::CheckCompleted(false))
            | (PollState::Checking, PollEvent::CheckFailed) => Some(PollState::NotDone),
            (PollState::NotDone, PollEvent::Rescheduled) => Some(PollState::Waiting),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PollState::AllDone
    }
}

/// Result of one status query for an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCheck {
    /// Number of jobs the execution submitted.
    pub expected: usize,
    pub jobs: Vec<JobSummary>,
}

impl PollCheck {
    pub fn terminal_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.status.is_terminal()).count()
    }

    /// Chunk indices of jobs the engine reports as failed.
    pub fn failed_chunks(&self) -> Vec<u32> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .filter_map(|j| j.job_id.chunk_index())
            .collect()
    }

    /// Every expected job is listed and terminal. An empty listing is never
    /// done.
    pub fn all_done(&self) -> bool {
        !self.jobs.is_empty()
            && self.jobs.len() >= self.expected
            && self.terminal_count() == self.jobs.len()
    }
}

pub struct CompletionPoller {
    engine: Arc<dyn TranscriptionEngine>,
}

impl CompletionPoller {
    pub fn new(engine: Arc<dyn TranscriptionEngine>) -> Self {
        Self { engine }
    }

    /// Asks the engine for the status of every job of the execution. Has no
    /// side effects on orchestrator state, so repeating it is always safe.
    pub fn check(&self, execution_id: &ExecutionId, expected: usize) -> Result<PollCheck, PollError> {
        let jobs = self
            .engine
            .list_jobs(execution_id)
            .map_err(|e| PollError::PollCheckFailed {
                execution_id: execution_id.to_string(),
                reason: e.to_string(),
            })?;

        let jobs: Vec<JobSummary> = jobs
            .into_iter()
            .filter(|j| j.job_id.belongs_to(execution_id))
            .collect();

        let check = PollCheck { expected, jobs };
        debug!(
            "Execution {}: {}/{} jobs terminal (expected {})",
            execution_id,
            check.terminal_count(),
            check.jobs.len(),
            expected
        );
        Ok(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobId;
    use crate::storage::{MemoryObjectStore, ObjectStore};
    use crate::transcription::{MockEngine, TranscriptionRequest};

    fn summary(exec: &ExecutionId, index: u32, status: JobStatus) -> JobSummary {
        JobSummary {
            job_id: JobId::for_chunk(exec, index),
            status,
        }
    }

    #[test]
    fn test_transitions() {
        use PollEvent::*;
        use PollState::*;

        assert_eq!(Waiting.transition(DelayElapsed), Some(Checking));
        assert_eq!(Checking.transition(CheckCompleted(true)), Some(AllDone));
        assert_eq!(Checking.transition(CheckCompleted(false)), Some(NotDone));
        assert_eq!(Checking.transition(CheckFailed), Some(NotDone));
        assert_eq!(NotDone.transition(Rescheduled), Some(Waiting));

        assert_eq!(Waiting.transition(CheckCompleted(true)), None);
        assert_eq!(AllDone.transition(Rescheduled), None);
        assert_eq!(AllDone.transition(DelayElapsed), None);
        assert!(AllDone.is_terminal());
    }

    #[test]
    fn test_all_done_rules() {
        let exec = ExecutionId::parse("e1").unwrap();
        let empty = PollCheck {
            expected: 0,
            jobs: vec![],
        };
        assert!(!empty.all_done());

        let partial_listing = PollCheck {
            expected: 3,
            jobs: vec![
                summary(&exec, 0, JobStatus::Succeeded),
                summary(&exec, 1, JobStatus::Succeeded),
            ],
        };
        assert!(!partial_listing.all_done());

        let running = PollCheck {
            expected: 2,
            jobs: vec![
                summary(&exec, 0, JobStatus::Succeeded),
                summary(&exec, 1, JobStatus::Running),
            ],
        };
        assert!(!running.all_done());

        let finished = PollCheck {
            expected: 2,
            jobs: vec![
                summary(&exec, 0, JobStatus::Succeeded),
                summary(&exec, 1, JobStatus::Failed),
            ],
        };
        assert!(finished.all_done());
        assert_eq!(finished.failed_chunks(), vec![1]);
    }

    fn submit_all(store: &MemoryObjectStore, engine: &MockEngine, exec: &ExecutionId, n: u32) {
        for index in 0..n {
            let media = format!("{}/{}", exec, index);
            store.put(&media, b"media").unwrap();
            engine
                .submit(&TranscriptionRequest {
                    job_id: JobId::for_chunk(exec, index),
                    media_location: media,
                    output_location: format!("{}/transcripts/{}.json", exec, index),
                    language_code: "en-GB".to_string(),
                })
                .unwrap();
        }
    }

    #[test]
    fn test_poller_converges_within_bound_and_never_earlier() {
        for bound in 1..=5u32 {
            let store = Arc::new(MemoryObjectStore::new());
            let engine = Arc::new(MockEngine::new(store.clone()).with_checks_to_complete(bound));
            let exec = ExecutionId::parse("e1").unwrap();
            submit_all(&store, &engine, &exec, 3);

            let poller = CompletionPoller::new(engine.clone());
            let mut state = PollState::Waiting;
            let mut checks = 0;
            while !state.is_terminal() {
                assert!(checks < bound, "poller did not converge within {bound} checks");
                state = state.transition(PollEvent::DelayElapsed).unwrap();
                let check = poller.check(&exec, 3).unwrap();
                checks += 1;
                state = state
                    .transition(PollEvent::CheckCompleted(check.all_done()))
                    .unwrap();
                if state == PollState::NotDone {
                    state = state.transition(PollEvent::Rescheduled).unwrap();
                }
            }
            assert_eq!(checks, bound);
        }
    }

    #[test]
    fn test_engine_outage_is_poll_check_failed() {
        let store = Arc::new(MemoryObjectStore::new());
        let engine = Arc::new(MockEngine::new(store.clone()).with_unavailable_checks(1));
        let exec = ExecutionId::parse("e1").unwrap();
        submit_all(&store, &engine, &exec, 1);

        let poller = CompletionPoller::new(engine);
        assert!(matches!(
            poller.check(&exec, 1),
            Err(PollError::PollCheckFailed { .. })
        ));
        assert!(poller.check(&exec, 1).unwrap().all_done());
    }
}
