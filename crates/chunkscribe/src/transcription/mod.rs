pub mod engine;
pub mod mock;

pub use engine::{TranscriptionEngine, TranscriptionRequest};
pub use mock::MockEngine;
