use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::StorageError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Execution {0} already exists")]
    ExecutionExists(String),

    #[error("Invalid trigger for '{key}': {reason}")]
    InvalidTrigger { key: String, reason: String },

    #[error("Execution {0} not found")]
    NotFound(String),

    #[error("Execution {execution_id} cannot move from {from} to {to}")]
    InvalidTransition {
        execution_id: String,
        from: String,
        to: String,
    },

    #[error("Execution {execution_id}: poll interval of {interval:?} overflows the clock")]
    ScheduleOverflow {
        execution_id: String,
        interval: std::time::Duration,
    },

    #[error("Corrupt state for execution {execution_id}: {reason}")]
    CorruptState { execution_id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
