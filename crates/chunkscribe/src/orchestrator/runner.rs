use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, info_span, warn};

use crate::aggregator::OrderedAggregator;
use crate::broadcast::{ExecutionProgressBroadcaster, ExecutionProgressEvent};
use crate::config::Config;
use crate::db::chunk_job_repo::{self, ChunkJobRow, STAGE_FAILED, STAGE_SUBMITTED};
use crate::db::{execution_repo, format_timestamp, Database};
use crate::error::{AggregationError, ChunkscribeError, PlanningError};
use crate::model::{Chunk, Execution, ExecutionId, ExecutionPhase, JobId, TriggerEvent};
use crate::pipeline::{ChunkExtractor, ChunkPipeline, FfmpegExtractor};
use crate::planner::{ChunkPlanner, FfprobeProbe, MediaProbe};
use crate::poller::{CompletionPoller, PollCheck, PollEvent, PollState};
use crate::results::{ResultStore, SqliteResultStore};
use crate::storage::{FsObjectStore, ObjectStore, Workspace};
use crate::transcription::TranscriptionEngine;
use crate::worker::{ChunkTask, FanOutExecutor, FanOutReport};

use super::error::OrchestratorError;
use super::settings::OrchestratorSettings;
use super::state::ExecutionRecord;

/// External collaborators the orchestrator depends on only by contract.
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn MediaProbe>,
    pub extractor: Arc<dyn ChunkExtractor>,
    pub engine: Arc<dyn TranscriptionEngine>,
    pub objects: Arc<dyn ObjectStore>,
    pub results: Arc<dyn ResultStore>,
}

/// What one scheduler tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub rescheduled: usize,
    pub completed: usize,
    pub failed: usize,
    /// Executions that could not be advanced this tick; they stay due.
    pub errors: usize,
}

/// Drives executions through `planning -> fanning_out -> waiting ->
/// aggregating -> completed`.
///
/// All state lives in the database between calls, so a restarted process
/// picks up where the previous one stopped via [`Orchestrator::tick`] and
/// [`Orchestrator::resume_interrupted`].
pub struct Orchestrator {
    settings: OrchestratorSettings,
    db: Database,
    workspace: Workspace,
    planner: ChunkPlanner,
    executor: FanOutExecutor,
    pipeline: ChunkPipeline,
    poller: CompletionPoller,
    aggregator: OrderedAggregator,
    progress: ExecutionProgressBroadcaster,
}

impl Orchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        db: Database,
        workspace: Workspace,
        collaborators: Collaborators,
        progress: ExecutionProgressBroadcaster,
    ) -> Self {
        let Collaborators {
            probe,
            extractor,
            engine,
            objects,
            results,
        } = collaborators;

        let planner = ChunkPlanner::new(probe, settings.chunk_duration_secs);
        let executor = FanOutExecutor::new(settings.max_concurrency);
        let pipeline = ChunkPipeline::new(
            workspace.clone(),
            Arc::clone(&objects),
            extractor,
            Arc::clone(&engine),
            &settings.language_code,
        )
        .with_progress(progress.clone());
        let poller = CompletionPoller::new(engine);
        let aggregator = OrderedAggregator::new(results, objects, &settings.separator);

        Self {
            settings,
            db,
            workspace,
            planner,
            executor,
            pipeline,
            poller,
            aggregator,
            progress,
        }
    }

    /// Production wiring: ffprobe/ffmpeg, the filesystem object store and the
    /// SQLite database named in the config. The engine is supplied by the
    /// caller.
    pub fn from_config(
        config: &Config,
        engine: Arc<dyn TranscriptionEngine>,
    ) -> Result<Self, ChunkscribeError> {
        let db = Database::open(std::path::Path::new(&config.database_path))?;
        let collaborators = Collaborators {
            probe: Arc::new(FfprobeProbe::new(&config.chunking.ffprobe_path)),
            extractor: Arc::new(FfmpegExtractor::new(&config.chunking.ffmpeg_path)),
            engine,
            objects: Arc::new(FsObjectStore::new(&config.object_store_directory)),
            results: Arc::new(SqliteResultStore::new(db.clone())),
        };

        Ok(Self::new(
            OrchestratorSettings::from_config(config),
            db,
            Workspace::new(&config.workspace_directory),
            collaborators,
            ExecutionProgressBroadcaster::default(),
        ))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn progress(&self) -> &ExecutionProgressBroadcaster {
        &self.progress
    }

    /// Starts a new execution for an uploaded source file under a fresh id.
    pub fn handle_trigger(
        &self,
        event: &TriggerEvent,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        self.start_execution(ExecutionId::generate(), &event.source_file_key)
    }

    /// Plans and fans out a new execution, leaving it `waiting` for the
    /// first completion check (or `failed`).
    ///
    /// An id that is already taken is rejected without touching the existing
    /// execution.
    pub fn start_execution(
        &self,
        execution_id: ExecutionId,
        source_file_key: &str,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let source = self
            .workspace
            .source_path(source_file_key)
            .map_err(|e| OrchestratorError::InvalidTrigger {
                key: source_file_key.to_string(),
                reason: e.to_string(),
            })?;
        if !source.is_file() {
            return Err(OrchestratorError::InvalidTrigger {
                key: source_file_key.to_string(),
                reason: format!("{} is not a file", source.display()),
            });
        }

        let execution = Execution::new(execution_id, source_file_key, Utc::now());
        let record = ExecutionRecord::new(execution);
        self.next_check_at(record.execution_id(), record.execution.started_at)?;
        if !execution_repo::try_insert(&self.db, &record.to_row()?)? {
            return Err(OrchestratorError::ExecutionExists(
                record.execution_id().to_string(),
            ));
        }

        info!(
            "Started execution {} for {}",
            record.execution_id(),
            source_file_key
        );
        self.progress.phase(
            record.execution_id(),
            ExecutionPhase::Planning,
            &format!("Planning {}", source_file_key),
        );

        self.plan_and_fan_out(record)
    }

    pub fn status(&self, execution_id: &ExecutionId) -> Result<ExecutionRecord, OrchestratorError> {
        let row = execution_repo::find_by_id(&self.db, execution_id.as_str())?
            .ok_or_else(|| OrchestratorError::NotFound(execution_id.to_string()))?;
        ExecutionRecord::from_row(row)
    }

    /// Per-chunk job rows of an execution, by chunk index.
    pub fn chunk_jobs(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<ChunkJobRow>, OrchestratorError> {
        Ok(chunk_job_repo::find_by_execution(&self.db, execution_id.as_str())?)
    }

    /// Number of executions currently waiting on the engine.
    pub fn waiting_count(&self) -> Result<u64, OrchestratorError> {
        Ok(execution_repo::count_by_phase(
            &self.db,
            ExecutionPhase::Waiting.as_str(),
        )?)
    }

    /// Runs one completion check for every `waiting` execution that is due.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, OrchestratorError> {
        let due = execution_repo::find_due(
            &self.db,
            ExecutionPhase::Waiting.as_str(),
            &format_timestamp(now),
        )?;

        let mut report = TickReport::default();
        for row in due {
            let id = row.id.clone();
            let outcome =
                ExecutionRecord::from_row(row).and_then(|record| self.poll_once(record, now));
            match outcome {
                Ok(record) => {
                    report.checked += 1;
                    match record.phase {
                        ExecutionPhase::Completed => report.completed += 1,
                        ExecutionPhase::Failed => report.failed += 1,
                        _ => report.rescheduled += 1,
                    }
                }
                Err(e) => {
                    error!("Failed to advance execution {}: {}", id, e);
                    report.errors += 1;
                }
            }
        }

        if report.checked > 0 || report.errors > 0 {
            debug!("Tick: {:?}", report);
        }
        Ok(report)
    }

    /// Re-drives executions a crash left in `planning`, `fanning_out` or
    /// `aggregating`. Deterministic job ids and overwriting keys make the
    /// repeated work safe. An execution that cannot be resumed is logged and
    /// skipped; the rest still run.
    pub fn resume_interrupted(&self) -> Result<Vec<ExecutionRecord>, OrchestratorError> {
        let rows = execution_repo::find_by_phases(
            &self.db,
            &[
                ExecutionPhase::Planning.as_str(),
                ExecutionPhase::FanningOut.as_str(),
                ExecutionPhase::Aggregating.as_str(),
            ],
        )?;

        let mut resumed = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match ExecutionRecord::from_row(row).and_then(|record| self.resume(record)) {
                Ok(record) => resumed.push(record),
                Err(e) => error!("Failed to resume execution {}: {}", id, e),
            }
        }
        Ok(resumed)
    }

    fn resume(&self, record: ExecutionRecord) -> Result<ExecutionRecord, OrchestratorError> {
        info!(
            "Resuming execution {} from {}",
            record.execution_id(),
            record.phase
        );
        match record.phase {
            ExecutionPhase::Aggregating => self.aggregate(record, Utc::now()),
            _ => self.plan_and_fan_out(record),
        }
    }

    fn plan_and_fan_out(
        &self,
        mut record: ExecutionRecord,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let _span = info_span!("execution", execution_id = %record.execution_id()).entered();

        let chunks = match self.plan(&record) {
            Ok(chunks) => chunks,
            Err(e) => return self.fail(record, &e.to_string(), Vec::new()),
        };
        let count = u32::try_from(chunks.len()).map_err(|_| OrchestratorError::CorruptState {
            execution_id: record.execution_id().to_string(),
            reason: format!("{} chunks do not fit a chunk index", chunks.len()),
        })?;

        let now = Utc::now();
        if record.phase == ExecutionPhase::Planning {
            record.chunk_count = Some(count);
            record.advance(ExecutionPhase::FanningOut, now)?;
            self.save(&record)?;
        } else if record.chunk_count != Some(count) {
            let reason = format!(
                "re-planning produced {} chunks, expected {:?}",
                count, record.chunk_count
            );
            return self.fail(record, &reason, Vec::new());
        }

        self.progress.phase(
            record.execution_id(),
            ExecutionPhase::FanningOut,
            &format!("Fanning out {} chunks", count),
        );

        if let Err(e) = self.workspace.ensure_execution_dir(record.execution_id()) {
            return self.fail(record, &e.to_string(), Vec::new());
        }

        let execution = Arc::new(record.execution.clone());
        let tasks: Vec<ChunkTask> = chunks
            .iter()
            .map(|chunk| ChunkTask::new(Arc::clone(&execution), *chunk))
            .collect();
        let report = self.executor.run(&self.pipeline, tasks);
        self.save_chunk_jobs(record.execution_id(), &chunks, &report)?;

        if !report.all_succeeded() {
            let failed = report.failed_indices();
            let reason = format!(
                "{} of {} chunks failed before submission",
                failed.len(),
                count
            );
            return self.fail(record, &reason, failed);
        }

        let now = Utc::now();
        let next_check_at = match self.next_check_at(record.execution_id(), now) {
            Ok(at) => at,
            Err(e) => return self.fail(record, &e.to_string(), Vec::new()),
        };
        record.advance(ExecutionPhase::Waiting, now)?;
        record.poll_attempts = 0;
        record.next_check_at = Some(next_check_at);
        self.save(&record)?;

        info!(
            "Execution {} submitted {} jobs, first check at {:?}",
            record.execution_id(),
            report.submitted().count(),
            record.next_check_at
        );
        self.progress.phase(
            record.execution_id(),
            ExecutionPhase::Waiting,
            "Waiting for transcription jobs",
        );
        Ok(record)
    }

    fn plan(&self, record: &ExecutionRecord) -> Result<Vec<Chunk>, PlanningError> {
        let _step = info_span!("plan").entered();
        let source = self
            .workspace
            .source_path(&record.execution.source_file_ref)
            .map_err(|e| PlanningError::PlanningFailed {
                path: record.execution.source_file_ref.clone().into(),
                reason: e.to_string(),
            })?;
        self.planner.plan(&source)
    }

    fn save_chunk_jobs(
        &self,
        execution_id: &ExecutionId,
        chunks: &[Chunk],
        report: &FanOutReport,
    ) -> Result<(), OrchestratorError> {
        let by_index: HashMap<u32, &Chunk> = chunks.iter().map(|c| (c.index, c)).collect();
        let now = format_timestamp(Utc::now());

        for outcome in &report.outcomes {
            let Some(chunk) = by_index.get(&outcome.index) else {
                warn!("Fan-out reported unknown chunk {}", outcome.index);
                continue;
            };
            let mut row = ChunkJobRow {
                job_id: JobId::for_chunk(execution_id, chunk.index).to_string(),
                execution_id: execution_id.to_string(),
                chunk_index: chunk.index,
                start_offset: chunk.start_offset,
                duration: chunk.duration,
                media_location: None,
                output_location: None,
                stage_status: STAGE_SUBMITTED.to_string(),
                engine_status: None,
                error: None,
                updated_at: now.clone(),
            };
            match &outcome.result {
                Ok(job) => {
                    row.media_location = Some(job.media_location.clone());
                    row.output_location = Some(job.output_location.clone());
                    row.engine_status = Some(job.status.as_str().to_string());
                }
                Err(e) => {
                    row.stage_status = STAGE_FAILED.to_string();
                    row.error = Some(e.to_string());
                }
            }
            chunk_job_repo::upsert(&self.db, &row)?;
        }
        Ok(())
    }

    /// One pass of the poll state machine: `Waiting -> Checking -> AllDone |
    /// NotDone -> Waiting`.
    fn poll_once(
        &self,
        mut record: ExecutionRecord,
        now: DateTime<Utc>,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let _span = info_span!("poll", execution_id = %record.execution_id()).entered();

        let expected = record.chunk_count.ok_or_else(|| OrchestratorError::CorruptState {
            execution_id: record.execution_id().to_string(),
            reason: "waiting without a chunk count".to_string(),
        })?;

        let mut state = self.step(&record, PollState::Waiting, PollEvent::DelayElapsed)?;
        let event = match self.poller.check(record.execution_id(), expected as usize) {
            Ok(check) => {
                self.save_engine_statuses(&check, now)?;
                PollEvent::CheckCompleted(check.all_done())
            }
            Err(e) => {
                warn!("{}", e);
                PollEvent::CheckFailed
            }
        };
        state = self.step(&record, state, event)?;

        if state == PollState::AllDone {
            return self.aggregate(record, now);
        }

        record.poll_attempts += 1;
        if let Some(max) = self.settings.max_poll_attempts {
            if record.poll_attempts >= max {
                let reason = format!(
                    "jobs not done after {} completion checks",
                    record.poll_attempts
                );
                return self.fail(record, &reason, Vec::new());
            }
        }

        let next_check_at = match self.next_check_at(record.execution_id(), now) {
            Ok(at) => at,
            Err(e) => return self.fail(record, &e.to_string(), Vec::new()),
        };
        self.step(&record, state, PollEvent::Rescheduled)?;
        record.advance(ExecutionPhase::Waiting, now)?;
        record.next_check_at = Some(next_check_at);
        self.save(&record)?;
        debug!(
            "Execution {} not done, next check at {:?}",
            record.execution_id(),
            record.next_check_at
        );
        Ok(record)
    }

    fn next_check_at(
        &self,
        execution_id: &ExecutionId,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, OrchestratorError> {
        now.checked_add_signed(self.settings.poll_delay())
            .ok_or_else(|| OrchestratorError::ScheduleOverflow {
                execution_id: execution_id.to_string(),
                interval: self.settings.poll_interval,
            })
    }

    fn step(
        &self,
        record: &ExecutionRecord,
        state: PollState,
        event: PollEvent,
    ) -> Result<PollState, OrchestratorError> {
        state
            .transition(event)
            .ok_or_else(|| OrchestratorError::InvalidTransition {
                execution_id: record.execution_id().to_string(),
                from: format!("{:?}", state),
                to: format!("{:?}", event),
            })
    }

    fn save_engine_statuses(
        &self,
        check: &PollCheck,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let updated_at = format_timestamp(now);
        for job in &check.jobs {
            chunk_job_repo::update_engine_status(
                &self.db,
                job.job_id.as_str(),
                job.status.as_str(),
                &updated_at,
            )?;
        }
        let failed = check.failed_chunks();
        if !failed.is_empty() {
            warn!("Transcription jobs failed for chunks {:?}", failed);
        }
        Ok(())
    }

    fn aggregate(
        &self,
        mut record: ExecutionRecord,
        now: DateTime<Utc>,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let _step = info_span!("aggregate", execution_id = %record.execution_id()).entered();

        if record.phase != ExecutionPhase::Aggregating {
            record.advance(ExecutionPhase::Aggregating, now)?;
            self.save(&record)?;
        }
        self.progress.phase(
            record.execution_id(),
            ExecutionPhase::Aggregating,
            "Aggregating transcripts",
        );

        let expected = record.chunk_count.unwrap_or(0);
        match self.aggregator.aggregate(record.execution_id(), expected) {
            Ok(outcome) => {
                record.result_key = Some(outcome.result_key.clone());
                record.advance(ExecutionPhase::Completed, now)?;
                self.save(&record)?;

                if self.settings.cleanup_workspace {
                    if let Err(e) = self.workspace.cleanup_execution(record.execution_id()) {
                        warn!("Failed to clean up scratch files: {}", e);
                    }
                }

                info!(
                    "Execution {} completed: {}",
                    record.execution_id(),
                    outcome.result_key
                );
                self.progress.phase(
                    record.execution_id(),
                    ExecutionPhase::Completed,
                    &format!("Transcript written to {}", outcome.result_key),
                );
                Ok(record)
            }
            Err(e) => {
                let missing = match &e {
                    AggregationError::AggregationIncomplete { missing, .. } => missing.clone(),
                    _ => Vec::new(),
                };
                if e.is_integrity_failure() {
                    error!("Integrity failure: {}", e);
                }
                self.fail(record, &e.to_string(), missing)
            }
        }
    }

    fn fail(
        &self,
        mut record: ExecutionRecord,
        reason: &str,
        failed_chunks: Vec<u32>,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        record.advance(ExecutionPhase::Failed, Utc::now())?;
        record.error = Some(reason.to_string());
        record.failed_chunks = failed_chunks;
        self.save(&record)?;

        error!("Execution {} failed: {}", record.execution_id(), reason);
        self.progress.send(
            ExecutionProgressEvent::new(
                record.execution_id(),
                ExecutionPhase::Failed,
                "Execution failed",
            )
            .with_error(reason),
        );
        Ok(record)
    }

    fn save(&self, record: &ExecutionRecord) -> Result<(), OrchestratorError> {
        execution_repo::update(&self.db, &record.to_row()?)?;
        Ok(())
    }
}
