use thiserror::Error;

/// Failure of one chunk's worker pipeline. Only that chunk is affected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("Extract failed for chunk {index}: {reason}")]
    ExtractFailed { index: u32, reason: String },

    #[error("Staging failed for chunk {index}: {reason}")]
    StageFailed { index: u32, reason: String },

    #[error("Submit failed for chunk {index}: {reason}")]
    SubmitFailed { index: u32, reason: String },

    /// The worker running the chunk died before reporting an outcome.
    #[error("Worker lost while processing chunk {index}: {reason}")]
    WorkerLost { index: u32, reason: String },
}

impl StageError {
    pub fn index(&self) -> u32 {
        match self {
            StageError::ExtractFailed { index, .. }
            | StageError::StageFailed { index, .. }
            | StageError::SubmitFailed { index, .. }
            | StageError::WorkerLost { index, .. } => *index,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            StageError::ExtractFailed { .. } => "extract",
            StageError::StageFailed { .. } => "stage",
            StageError::SubmitFailed { .. } => "submit",
            StageError::WorkerLost { .. } => "worker",
        }
    }
}
