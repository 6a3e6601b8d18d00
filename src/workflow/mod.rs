//! Workflow orchestration: per-instance state and the triage engine.

pub mod engine;
pub mod state;

pub use engine::{SuspendedWorkflow, TriageEngine, WorkflowOutcome};
pub use state::{EmailContext, EmailMessage, WorkflowState};
