//! Persisted execution lifecycle: trigger, plan, fan out, poll, aggregate.

pub mod error;
pub mod runner;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use error::OrchestratorError;
pub use runner::{Collaborators, Orchestrator, TickReport};
pub use scheduler::PollScheduler;
pub use settings::OrchestratorSettings;
pub use state::ExecutionRecord;
