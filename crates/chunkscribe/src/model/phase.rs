use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Persisted lifecycle phase of an execution.
///
/// `planning -> fanning_out -> waiting -> aggregating -> completed`, with
/// `failed` reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Planning,
    FanningOut,
    Waiting,
    Aggregating,
    Completed,
    Failed,
}

impl ExecutionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionPhase::Planning => "planning",
            ExecutionPhase::FanningOut => "fanning_out",
            ExecutionPhase::Waiting => "waiting",
            ExecutionPhase::Aggregating => "aggregating",
            ExecutionPhase::Completed => "completed",
            ExecutionPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionPhase::Completed | ExecutionPhase::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: ExecutionPhase) -> bool {
        use ExecutionPhase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Planning, FanningOut)
            | (FanningOut, Waiting)
            | (Waiting, Waiting)
            | (Waiting, Aggregating)
            | (Aggregating, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(ExecutionPhase::Planning),
            "fanning_out" => Ok(ExecutionPhase::FanningOut),
            "waiting" => Ok(ExecutionPhase::Waiting),
            "aggregating" => Ok(ExecutionPhase::Aggregating),
            "completed" => Ok(ExecutionPhase::Completed),
            "failed" => Ok(ExecutionPhase::Failed),
            other => Err(format!("unknown execution phase '{}'", other)),
        }
    }
}
