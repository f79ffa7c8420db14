use std::path::{Path, PathBuf};

use log::debug;

use super::keys::validate_key;
use crate::error::StorageError;
use crate::model::ExecutionId;

/// Directory under the workspace root that holds every execution's scratch
/// files. Source keys may not point into it.
pub const SCRATCH_DIR: &str = ".executions";

/// The shared working filesystem. Source files are addressed relative to the
/// root; each execution gets its own scratch directory
/// `{root}/.executions/{executionId}`, outside the source key space.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_path(&self, source_file_key: &str) -> Result<PathBuf, StorageError> {
        validate_key(source_file_key)?;
        if source_file_key.split('/').next() == Some(SCRATCH_DIR) {
            return Err(StorageError::InvalidKey {
                key: source_file_key.to_string(),
                reason: format!("{} is reserved for scratch files", SCRATCH_DIR),
            });
        }
        Ok(self.root.join(source_file_key))
    }

    pub fn execution_dir(&self, execution_id: &ExecutionId) -> PathBuf {
        self.root.join(SCRATCH_DIR).join(execution_id.as_str())
    }

    /// Scratch file for one chunk: `{root}/.executions/{executionId}/{index}_{fileName}`.
    pub fn chunk_path(&self, execution_id: &ExecutionId, index: u32, file_name: &str) -> PathBuf {
        self.execution_dir(execution_id)
            .join(format!("{}_{}", index, file_name))
    }

    pub fn ensure_execution_dir(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.execution_dir(execution_id);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }

    /// Removes the execution's scratch directory. Missing directories are fine.
    pub fn cleanup_execution(&self, execution_id: &ExecutionId) -> Result<(), StorageError> {
        let dir = self.execution_dir(execution_id);
        if !dir.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(&dir).map_err(|e| StorageError::RemoveFile {
            path: dir.clone(),
            source: e,
        })?;
        debug!("Removed scratch directory {}", dir.display());
        Ok(())
    }
}
