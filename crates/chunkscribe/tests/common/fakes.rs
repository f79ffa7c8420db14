//! Stand-ins for the media tools.
//!
//! Source files written by the harness contain their own duration in
//! seconds, so the probe just parses the file.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;

use chunkscribe::error::PlanningError;
use chunkscribe::model::Chunk;
use chunkscribe::pipeline::{ChunkExtractor, ExtractError};
use chunkscribe::planner::MediaProbe;

pub struct TextDurationProbe;

impl MediaProbe for TextDurationProbe {
    fn duration(&self, path: &Path) -> Result<f64, PlanningError> {
        let text = std::fs::read_to_string(path).map_err(|e| PlanningError::ProbeFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        chunkscribe::planner::parse_sexagesimal(text.trim())
    }
}

/// Writes `{source}:{start}-{end}` as the chunk's media.
#[derive(Default)]
pub struct SliceExtractor {
    failing: BTreeSet<u32>,
}

impl SliceExtractor {
    pub fn failing_on(indices: &[u32]) -> Self {
        Self {
            failing: indices.iter().copied().collect(),
        }
    }
}

impl ChunkExtractor for SliceExtractor {
    fn extract(&self, source: &Path, chunk: &Chunk, dest: &Path) -> Result<(), ExtractError> {
        if !source.is_file() {
            return Err(ExtractError::MissingSource(source.to_path_buf()));
        }
        if self.failing.contains(&chunk.index) {
            return Err(ExtractError::Exit {
                binary: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("corrupt frame at {}", chunk.start_offset),
            });
        }
        let name = source.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        let body = format!("{}:{}-{}", name, chunk.start_offset, chunk.end_offset());
        std::fs::write(dest, body).map_err(|e| ExtractError::Prepare {
            path: dest.to_path_buf(),
            source: e,
        })
    }
}
