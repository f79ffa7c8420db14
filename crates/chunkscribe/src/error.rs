use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkscribeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transcription engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] crate::orchestrator::OrchestratorError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Planning failed for '{path}': {reason}")]
    PlanningFailed { path: PathBuf, reason: String },

    #[error("Failed to probe media '{path}': {source}")]
    ProbeFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid media duration '{0}'")]
    InvalidDuration(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Object store lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Transcription engine unavailable: {0}")]
    Unavailable(String),

    #[error("Transcription quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Invalid transcription request: {0}")]
    InvalidRequest(String),
}

/// Failure of a single status check. Always transient: the next scheduled
/// tick retries it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Completion check failed for execution {execution_id}: {reason}")]
    PollCheckFailed {
        execution_id: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error(
        "Aggregation incomplete for execution {execution_id}: expected {expected} records, found {found} (missing chunks {missing:?})"
    )]
    AggregationIncomplete {
        execution_id: String,
        expected: u32,
        found: u32,
        missing: Vec<u32>,
    },

    #[error("Malformed transcript record '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("Result storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Result query failed: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl AggregationError {
    /// True for the integrity failure, as opposed to an I/O problem reading
    /// or writing results.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, AggregationError::AggregationIncomplete { .. })
    }
}

pub type Result<T> = std::result::Result<T, ChunkscribeError>;
