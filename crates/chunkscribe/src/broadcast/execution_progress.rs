//! Execution progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{ExecutionId, ExecutionPhase};

/// Progress event for an execution, or for one chunk of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionProgressEvent {
    pub execution_id: String,
    pub phase: ExecutionPhase,
    /// Set for chunk-level events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionProgressEvent {
    pub fn new(execution_id: &ExecutionId, phase: ExecutionPhase, message: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            phase,
            chunk_index: None,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn chunk(execution_id: &ExecutionId, index: u32, message: &str) -> Self {
        Self {
            chunk_index: Some(index),
            ..Self::new(execution_id, ExecutionPhase::FanningOut, message)
        }
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Broadcasts execution progress events to any number of subscribers.
#[derive(Clone)]
pub struct ExecutionProgressBroadcaster {
    sender: Arc<broadcast::Sender<ExecutionProgressEvent>>,
}

impl ExecutionProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: ExecutionProgressEvent) {
        // No active receivers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionProgressEvent> {
        self.sender.subscribe()
    }

    pub fn phase(&self, execution_id: &ExecutionId, phase: ExecutionPhase, message: &str) {
        self.send(ExecutionProgressEvent::new(execution_id, phase, message));
    }
}

impl Default for ExecutionProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
