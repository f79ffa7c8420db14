//! Execution identity and the trigger that starts an Execution.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique token for one top-level run.
///
/// Used verbatim as the prefix of every workspace path, object key and job
/// id derived for the run, so only ASCII alphanumerics and `-` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExecutionId(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid execution id '{value}': {reason}")]
pub struct InvalidExecutionId {
    pub value: String,
    pub reason: &'static str,
}

impl ExecutionId {
    /// Generates a fresh id from a v4 UUID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(value: &str) -> Result<Self, InvalidExecutionId> {
        if value.is_empty() {
            return Err(InvalidExecutionId {
                value: value.to_string(),
                reason: "must not be empty",
            });
        }
        if value.len() > 128 {
            return Err(InvalidExecutionId {
                value: value.to_string(),
                reason: "must be at most 128 characters",
            });
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(InvalidExecutionId {
                value: value.to_string(),
                reason: "only ASCII letters, digits and '-' are allowed",
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExecutionId {
    type Err = InvalidExecutionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExecutionId {
    type Error = InvalidExecutionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExecutionId> for String {
    fn from(id: ExecutionId) -> Self {
        id.0
    }
}

/// One top-level run over one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub execution_id: ExecutionId,
    /// Key of the source file relative to the shared workspace.
    pub source_file_ref: String,
    pub started_at: DateTime<Utc>,
}

impl Execution {
    pub fn new(execution_id: ExecutionId, source_file_ref: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            execution_id,
            source_file_ref: source_file_ref.to_string(),
            started_at,
        }
    }

    /// File name component of the source key (`videos/a.mp4` -> `a.mp4`).
    pub fn source_file_name(&self) -> &str {
        self.source_file_ref
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("source")
    }
}

/// The orchestrator's sole external trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub source_file_key: String,
}

impl TriggerEvent {
    pub fn new(source_file_key: &str) -> Self {
        Self {
            source_file_key: source_file_key.to_string(),
        }
    }
}
