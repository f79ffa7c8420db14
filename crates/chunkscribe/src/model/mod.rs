pub mod chunk;
pub mod execution;
pub mod job;
pub mod phase;
pub mod record;

pub use chunk::Chunk;
pub use execution::{Execution, ExecutionId, InvalidExecutionId, TriggerEvent};
pub use job::{JobId, JobStatus, JobSummary, TranscriptionJob};
pub use phase::ExecutionPhase;
pub use record::{TranscriptAlternative, TranscriptRecord, TranscriptResults};
