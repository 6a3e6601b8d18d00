//! Execution dispatcher — approved decisions to bound tool calls.
//!
//! Runs only after the validator and the confirmation gate have both said
//! yes. Failures here are terminal for the workflow instance and recorded
//! as data; they never corrupt validator or policy state, and nothing is
//! retried automatically.

pub mod invoker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::decision::candidate::CandidateDecision;
use crate::policy::model::CompiledPolicy;

pub use invoker::{InvokeError, ToolInvoker, ToolRouter, ToolService};

// ── Outcome ─────────────────────────────────────────────────────────

/// What went wrong, when something did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    /// Action name absent from the policy's action table. Unreachable when
    /// the policy came from the compiler; its occurrence means the runtime
    /// state diverged from the compiled policy and is logged as a defect.
    UnknownAction,
    /// The tool collaborator failed.
    Transport,
}

/// Recorded result of dispatching one final decision. Verbatim: the tool's
/// result or failure text is stored as received, with a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The decision carried no action — a recorded no-op, not an error.
    Skipped {
        message: String,
        executed_at: DateTime<Utc>,
    },
    /// Internal action: completed without any external effect.
    Internal {
        action: String,
        executed_at: DateTime<Utc>,
    },
    /// External tool invocation succeeded.
    Invoked {
        tool: String,
        arguments: Map<String, Value>,
        result: Value,
        executed_at: DateTime<Utc>,
    },
    /// Terminal execution failure for this workflow instance.
    Error {
        kind: ExecutionErrorKind,
        message: String,
        tool: Option<String>,
        executed_at: DateTime<Utc>,
    },
}

impl ExecutionOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────

/// Resolves an approved action to a bound tool call, assembling arguments
/// from workflow state via the binding's declared dot-paths.
pub struct ExecutionDispatcher {
    invoker: Arc<dyn ToolInvoker>,
}

impl ExecutionDispatcher {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }

    /// Execute the final decision's primary action against `state_doc`,
    /// the JSON projection of the workflow state.
    pub async fn execute(
        &self,
        decision: &CandidateDecision,
        policy: &CompiledPolicy,
        state_doc: &Value,
    ) -> ExecutionOutcome {
        let Some(action) = decision.action.as_deref() else {
            debug!(decision = %decision.decision, "No action on decision, recording no-op");
            return ExecutionOutcome::Skipped {
                message: "No action specified".to_string(),
                executed_at: Utc::now(),
            };
        };

        let Some(action_policy) = policy.actions.get(action) else {
            // The compiler guarantees referential closure, so reaching this
            // arm means the runtime state no longer matches the compiled
            // policy.
            error!(action = %action, "Unknown action at dispatch — compiled policy/runtime mismatch");
            return ExecutionOutcome::Error {
                kind: ExecutionErrorKind::UnknownAction,
                message: format!("Unknown action: {action}"),
                tool: None,
                executed_at: Utc::now(),
            };
        };

        let Some(binding) = action_policy.invocation.as_ref() else {
            info!(action = %action, "Internal action completed");
            return ExecutionOutcome::Internal {
                action: action.to_string(),
                executed_at: Utc::now(),
            };
        };

        let arguments = assemble_arguments(&binding.argument_paths, state_doc);
        debug!(
            tool = %binding.tool,
            argument_count = arguments.len(),
            "Dispatching external tool call"
        );

        match self.invoker.invoke(&binding.tool, arguments.clone()).await {
            Ok(result) => {
                info!(tool = %binding.tool, "Tool call succeeded");
                ExecutionOutcome::Invoked {
                    tool: binding.tool.clone(),
                    arguments,
                    result,
                    executed_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(tool = %binding.tool, error = %e, "Tool call failed");
                ExecutionOutcome::Error {
                    kind: ExecutionErrorKind::Transport,
                    message: e.to_string(),
                    tool: Some(binding.tool.clone()),
                    executed_at: Utc::now(),
                }
            }
        }
    }
}

/// Resolve each declared dot-path against the state document. Paths that
/// resolve to nothing are omitted — never defaulted or fabricated.
fn assemble_arguments(
    argument_paths: &std::collections::BTreeMap<String, String>,
    state_doc: &Value,
) -> Map<String, Value> {
    let mut arguments = Map::new();
    for (name, path) in argument_paths {
        if let Some(value) = resolve_path(state_doc, path) {
            arguments.insert(name.clone(), value);
        }
    }
    arguments
}

/// Walk a dot-path (e.g. `email.thread_id`) through nested JSON objects.
/// Missing segments and explicit nulls both count as absent.
fn resolve_path(doc: &Value, path: &str) -> Option<Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current.clone())
    }
}
