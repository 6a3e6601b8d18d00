//! Workflow state — everything one triage instance accumulates.
//!
//! The state is append-only in spirit: each stage fills in its own fields
//! and never rewrites an earlier stage's output. `document()` projects the
//! state to JSON, which is also the document execution bindings resolve
//! their dot-path arguments against.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::decision::candidate::CandidateDecision;
use crate::decision::validator::ValidationResult;
use crate::executor::ExecutionOutcome;
use crate::gate::GateRoute;
use crate::policy::summarizer::PolicySummary;

/// One inbound email, as handed to the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(rename = "to")]
    pub recipient: String,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

/// Lightweight context derived from the email, extended by resume comments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailContext {
    pub sender: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Free-text comment attached to a resume signal, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_comment: Option<String>,
}

impl EmailContext {
    pub fn derive(email: &EmailMessage) -> Self {
        Self {
            sender: email.sender.clone(),
            subject: email.subject.clone(),
            thread_id: email.thread_id.clone(),
            human_comment: None,
        }
    }
}

/// Full state of one triage workflow instance.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    pub workflow_id: Uuid,
    pub domain: String,
    pub email: EmailMessage,
    pub context: EmailContext,
    pub policy_summary: PolicySummary,
    /// The proposer's raw candidate, kept for audit even after downgrades.
    pub candidate: CandidateDecision,
    pub validation: ValidationResult,
    pub final_decision: CandidateDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionOutcome>,
    pub route: GateRoute,
    /// How a suspended instance was resolved (e.g. a human rejection).
    /// The validator's verdict lives in `validation` and is never rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
}

impl WorkflowState {
    /// JSON projection of this state. Bindings resolve argument dot-paths
    /// (e.g. `email.thread_id`, `final_decision.email_body`) against it.
    pub fn document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_email() -> EmailMessage {
        EmailMessage {
            sender: "ana@fundco.example".to_string(),
            recipient: "founder@startup.example".to_string(),
            subject: "Following up on our term sheet".to_string(),
            body: "Hi, checking in on the revised terms we discussed last week. \
                   Could we get 30 minutes on Thursday?"
                .to_string(),
            thread_id: Some("thread-101".to_string()),
            attachments: vec![],
        }
    }

    #[test]
    fn context_derives_from_email() {
        let email = test_email();
        let context = EmailContext::derive(&email);
        assert_eq!(context.sender, email.sender);
        assert_eq!(context.thread_id.as_deref(), Some("thread-101"));
        assert!(context.human_comment.is_none());
    }

    #[test]
    fn email_serializes_with_wire_field_names() {
        let value = serde_json::to_value(test_email()).unwrap();
        assert_eq!(value["from"], "ana@fundco.example");
        assert_eq!(value["to"], "founder@startup.example");
        assert!(value.get("sender").is_none());
    }
}
