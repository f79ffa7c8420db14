use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::model::Chunk;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("source file '{0}' does not exist")]
    MissingSource(PathBuf),

    #[error("cannot create '{path}': {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    Exit {
        binary: String,
        status: String,
        stderr: String,
    },
}

/// Cuts one chunk out of the source media onto the working filesystem.
pub trait ChunkExtractor: Send + Sync {
    fn extract(&self, source: &Path, chunk: &Chunk, dest: &Path) -> Result<(), ExtractError>;
}

/// Stream-copies the chunk's time range with `ffmpeg`, without re-encoding.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    fn args(source: &Path, chunk: &Chunk, dest: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-ss".to_string(),
            format!("{:.6}", chunk.start_offset),
            "-t".to_string(),
            format!("{:.6}", chunk.duration),
            "-c".to_string(),
            "copy".to_string(),
            dest.to_string_lossy().to_string(),
        ]
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl ChunkExtractor for FfmpegExtractor {
    fn extract(&self, source: &Path, chunk: &Chunk, dest: &Path) -> Result<(), ExtractError> {
        if !source.is_file() {
            return Err(ExtractError::MissingSource(source.to_path_buf()));
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::Prepare {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let output = Command::new(&self.binary)
            .args(Self::args(source, chunk, dest))
            .output()
            .map_err(|e| ExtractError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ExtractError::Exit {
                binary: self.binary.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
