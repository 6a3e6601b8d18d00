//! Error types for Inbox Warden.
//!
//! Policy violations are deliberately NOT here — the validator reports them
//! as data (`ValidationResult`), never as errors. The same goes for execution
//! failures, which are recorded in the workflow's `ExecutionOutcome`.

use uuid::Uuid;

/// Top-level error type for the triage core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Candidate schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Proposer error: {0}")]
    Proposer(#[from] ProposerError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Policy loading and compilation errors.
///
/// These are configuration errors: fatal at compile
/// time, never reachable at execution time. Compilation fails closed — a
/// policy with any broken reference is never produced.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Policy domain not found: {domain} (looked in {path})")]
    DomainNotFound { domain: String, path: String },

    #[error("Missing policy document '{document}' for domain {domain}")]
    MissingDocument { domain: String, document: String },

    #[error("Failed to parse policy document '{document}': {message}")]
    Parse { document: String, message: String },

    #[error("Category '{category}' references unknown decision '{decision}'")]
    UnknownDecisionReference { category: String, decision: String },

    #[error("Decision '{decision}' references unknown action '{action}'")]
    UnknownActionReference { decision: String, action: String },

    #[error("External action '{action}' has no invocation binding")]
    MissingInvocationBinding { action: String },
}

/// Candidate decision schema errors.
///
/// A schema failure signals a malformed collaborator output. It is fatal for
/// that workflow instance and surfaced to the caller — never silently
/// coerced or downgraded.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unsupported schema version: {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: String },

    #[error("Confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("Proposed action is missing an action_type")]
    MissingActionType,

    #[error("Candidate decision is not a JSON object")]
    NotAnObject,

    #[error("Malformed candidate decision: {0}")]
    Malformed(String),
}

/// Candidate proposer errors (LLM transport, unparseable output).
#[derive(Debug, thiserror::Error)]
pub enum ProposerError {
    #[error("Proposer request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse proposer output: {0}")]
    InvalidOutput(String),

    #[error("Candidate schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Workflow orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("No suspended workflow with id {0}")]
    NotSuspended(Uuid),
}

/// Result type alias for the triage core.
pub type Result<T> = std::result::Result<T, Error>;
