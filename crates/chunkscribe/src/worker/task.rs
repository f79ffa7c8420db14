use std::sync::Arc;

use crate::model::{Chunk, Execution, TranscriptionJob};
use crate::pipeline::StageError;

/// One unit of fan-out work: a chunk of an execution.
#[derive(Debug, Clone)]
pub struct ChunkTask {
    pub execution: Arc<Execution>,
    pub chunk: Chunk,
}

impl ChunkTask {
    pub fn new(execution: Arc<Execution>, chunk: Chunk) -> Self {
        Self { execution, chunk }
    }

    pub fn index(&self) -> u32 {
        self.chunk.index
    }
}

/// Terminal outcome of one chunk.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub index: u32,
    pub result: Result<TranscriptionJob, StageError>,
}

impl ChunkOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs the per-chunk pipeline. Called concurrently from pool threads.
pub trait ChunkWorker: Send + Sync {
    fn process(&self, task: &ChunkTask) -> Result<TranscriptionJob, StageError>;
}
