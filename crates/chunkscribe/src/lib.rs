pub mod aggregator;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod planner;
pub mod poller;
pub mod results;
pub mod storage;
pub mod transcription;
pub mod worker;

pub use aggregator::{AggregateOutcome, OrderedAggregator};
pub use broadcast::{ExecutionProgressBroadcaster, ExecutionProgressEvent};
pub use config::{load_config, Config};
pub use db::Database;
pub use error::{
    AggregationError, ChunkscribeError, ConfigError, EngineError, PlanningError, PollError,
    Result, StorageError,
};
pub use model::{
    Chunk, Execution, ExecutionId, ExecutionPhase, JobId, JobStatus, TranscriptRecord,
    TranscriptionJob, TriggerEvent,
};
pub use orchestrator::{
    Collaborators, ExecutionRecord, Orchestrator, OrchestratorError, OrchestratorSettings,
    PollScheduler, TickReport,
};
pub use pipeline::{ChunkExtractor, ChunkPipeline, StageError};
pub use planner::{ChunkPlanner, MediaProbe};
pub use poller::{CompletionPoller, PollState};
pub use results::{ResultStore, SqliteResultStore};
pub use storage::{FsObjectStore, MemoryObjectStore, ObjectStore, Workspace};
pub use transcription::{MockEngine, TranscriptionEngine, TranscriptionRequest};
pub use worker::{FanOutExecutor, FanOutReport};
