pub mod context;
pub mod error;
pub mod extract;
pub mod runner;

pub use context::ChunkContext;
pub use error::StageError;
pub use extract::{ChunkExtractor, ExtractError, FfmpegExtractor};
pub use runner::ChunkPipeline;
