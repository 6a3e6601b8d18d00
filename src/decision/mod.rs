//! Decision layer — the untrusted candidate and its deterministic judge.

pub mod candidate;
pub mod validator;

pub use candidate::{CandidateDecision, ProposedAction, SCHEMA_VERSION};
pub use validator::{DecisionValidator, ValidationResult, ValidationStatus, Violation};
