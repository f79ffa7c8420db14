pub mod keys;
pub mod object_store;
pub mod workspace;

pub use keys::{chunk_media_key, result_key, transcript_output_key, transcripts_prefix};
pub use object_store::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use workspace::Workspace;
