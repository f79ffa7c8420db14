use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::broadcast::{ExecutionProgressBroadcaster, ExecutionProgressEvent};
use crate::model::{JobId, JobStatus, TranscriptionJob};
use crate::storage::{chunk_media_key, transcript_output_key, ObjectStore, Workspace};
use crate::transcription::{TranscriptionEngine, TranscriptionRequest};
use crate::worker::{ChunkTask, ChunkWorker};

use super::context::ChunkContext;
use super::error::StageError;
use super::extract::ChunkExtractor;

/// Extract, stage and submit for a single chunk.
///
/// Any stage failure ends the chunk's pipeline and is returned as-is; there
/// are no retries at this level.
pub struct ChunkPipeline {
    workspace: Workspace,
    objects: Arc<dyn ObjectStore>,
    extractor: Arc<dyn ChunkExtractor>,
    engine: Arc<dyn TranscriptionEngine>,
    language_code: String,
    progress: Option<ExecutionProgressBroadcaster>,
}

impl ChunkPipeline {
    pub fn new(
        workspace: Workspace,
        objects: Arc<dyn ObjectStore>,
        extractor: Arc<dyn ChunkExtractor>,
        engine: Arc<dyn TranscriptionEngine>,
        language_code: &str,
    ) -> Self {
        Self {
            workspace,
            objects,
            extractor,
            engine,
            language_code: language_code.to_string(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ExecutionProgressBroadcaster) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run all stages for one chunk.
    pub fn run(&self, mut ctx: ChunkContext) -> Result<TranscriptionJob, StageError> {
        let _pipeline_span = info_span!("chunk_pipeline",
            execution_id = %ctx.execution.execution_id,
            chunk_index = ctx.chunk.index,
        )
        .entered();

        let result = self.run_stages(&mut ctx);

        if let Some(progress) = &self.progress {
            let event = match &result {
                Ok(job) => ExecutionProgressEvent::chunk(
                    &ctx.execution.execution_id,
                    ctx.chunk.index,
                    &format!("Submitted job {}", job.job_id),
                ),
                Err(e) => ExecutionProgressEvent::chunk(
                    &ctx.execution.execution_id,
                    ctx.chunk.index,
                    &format!("Chunk failed in {} stage", e.stage()),
                )
                .with_error(&e.to_string()),
            };
            progress.send(event);
        }

        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    fn run_stages(&self, ctx: &mut ChunkContext) -> Result<TranscriptionJob, StageError> {
        {
            let _step = info_span!("extract").entered();
            self.step_extract(ctx)?;
        }
        {
            let _step = info_span!("stage").entered();
            self.step_stage(ctx)?;
        }
        {
            let _step = info_span!("submit").entered();
            self.step_submit(ctx)?;
        }

        ctx.job.clone().ok_or_else(|| StageError::SubmitFailed {
            index: ctx.chunk.index,
            reason: "no job recorded after submit".to_string(),
        })
    }

    fn step_extract(&self, ctx: &mut ChunkContext) -> Result<(), StageError> {
        let index = ctx.chunk.index;
        let failed = |reason: String| StageError::ExtractFailed { index, reason };

        let source = self
            .workspace
            .source_path(&ctx.execution.source_file_ref)
            .map_err(|e| failed(e.to_string()))?;
        let dest = self.workspace.chunk_path(
            &ctx.execution.execution_id,
            index,
            ctx.execution.source_file_name(),
        );

        self.extractor
            .extract(&source, &ctx.chunk, &dest)
            .map_err(|e| failed(e.to_string()))?;

        debug!(
            "Extracted [{:.3}, {:.3}) to {}",
            ctx.chunk.start_offset,
            ctx.chunk.end_offset(),
            dest.display()
        );
        ctx.scratch_path = Some(dest);
        Ok(())
    }

    fn step_stage(&self, ctx: &mut ChunkContext) -> Result<(), StageError> {
        let index = ctx.chunk.index;
        let failed = |reason: String| StageError::StageFailed { index, reason };

        let scratch = ctx
            .scratch_path
            .as_ref()
            .ok_or_else(|| failed("no extracted media".to_string()))?;
        let bytes = std::fs::read(scratch)
            .map_err(|e| failed(format!("cannot read {}: {}", scratch.display(), e)))?;

        let key = chunk_media_key(&ctx.execution.execution_id, index);
        self.objects
            .put(&key, &bytes)
            .map_err(|e| failed(e.to_string()))?;

        debug!("Staged {} bytes at {}", bytes.len(), key);
        ctx.media_key = Some(key);
        Ok(())
    }

    fn step_submit(&self, ctx: &mut ChunkContext) -> Result<(), StageError> {
        let index = ctx.chunk.index;
        let execution_id = &ctx.execution.execution_id;

        let media_location = ctx.media_key.clone().ok_or_else(|| StageError::SubmitFailed {
            index,
            reason: "no staged media".to_string(),
        })?;
        let request = TranscriptionRequest {
            job_id: JobId::for_chunk(execution_id, index),
            media_location,
            output_location: transcript_output_key(execution_id, index),
            language_code: self.language_code.clone(),
        };

        let job_id = self
            .engine
            .submit(&request)
            .map_err(|e| StageError::SubmitFailed {
                index,
                reason: e.to_string(),
            })?;

        debug!("Submitted transcription job {}", job_id);
        ctx.job = Some(TranscriptionJob {
            job_id,
            chunk_index: index,
            media_location: request.media_location,
            output_location: request.output_location,
            status: JobStatus::Pending,
        });
        Ok(())
    }
}

impl ChunkWorker for ChunkPipeline {
    fn process(&self, task: &ChunkTask) -> Result<TranscriptionJob, StageError> {
        self.run(ChunkContext::new(Arc::clone(&task.execution), task.chunk))
    }
}
