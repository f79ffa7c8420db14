use std::path::PathBuf;
use std::sync::Arc;

use crate::model::{Chunk, Execution, TranscriptionJob};

/// State carried through the stages of one chunk.
pub struct ChunkContext {
    // Input
    pub execution: Arc<Execution>,
    pub chunk: Chunk,

    // Extract result: chunk media on the working filesystem
    pub scratch_path: Option<PathBuf>,

    // Stage result: object key the engine reads from
    pub media_key: Option<String>,

    // Submit result
    pub job: Option<TranscriptionJob>,
}

impl ChunkContext {
    pub fn new(execution: Arc<Execution>, chunk: Chunk) -> Self {
        Self {
            execution,
            chunk,
            scratch_path: None,
            media_key: None,
            job: None,
        }
    }
}
