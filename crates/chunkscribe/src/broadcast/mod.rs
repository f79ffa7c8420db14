//! Broadcasting of execution progress for real-time event streaming.

pub mod execution_progress;

pub use execution_progress::{ExecutionProgressBroadcaster, ExecutionProgressEvent};
