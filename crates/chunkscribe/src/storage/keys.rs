//! Object key layout. Every key of an execution starts with `{executionId}/`.

use crate::error::StorageError;
use crate::model::ExecutionId;

pub fn chunk_media_key(execution_id: &ExecutionId, index: u32) -> String {
    format!("{}/{}", execution_id, index)
}

pub fn transcripts_prefix(execution_id: &ExecutionId) -> String {
    format!("{}/transcripts/", execution_id)
}

pub fn transcript_output_key(execution_id: &ExecutionId, index: u32) -> String {
    format!("{}{}.json", transcripts_prefix(execution_id), index)
}

pub fn result_key(execution_id: &ExecutionId) -> String {
    format!("{}/result", execution_id)
}

/// Checks that a key is a relative, normalized, `/`-separated path.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("key must be relative"));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(invalid("key contains a forbidden character"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(invalid("key contains an empty segment")),
            "." | ".." => return Err(invalid("key contains a relative segment")),
            _ => {}
        }
    }
    Ok(())
}
