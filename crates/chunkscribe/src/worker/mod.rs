pub mod pool;
pub mod task;

pub use pool::{FanOutExecutor, FanOutReport};
pub use task::{ChunkOutcome, ChunkTask, ChunkWorker};
