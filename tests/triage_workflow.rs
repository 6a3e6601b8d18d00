//! End-to-end triage workflow tests.
//!
//! Each test loads a real policy document set from a temp directory,
//! compiles it, and drives the engine with a scripted proposer and a
//! recording tool invoker — no network, no real LLM.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use inbox_warden::decision::{
    CandidateDecision, ProposedAction, SCHEMA_VERSION, ValidationStatus,
};
use inbox_warden::executor::{
    ExecutionDispatcher, ExecutionOutcome, InvokeError, ToolInvoker,
};
use inbox_warden::gate::{GateRoute, ResumeSignal};
use inbox_warden::policy::{BindingSet, CompiledPolicy, PolicyCompiler, PolicyLoader};
use inbox_warden::proposer::ScriptedProposer;
use inbox_warden::workflow::{EmailMessage, TriageEngine, WorkflowOutcome};

// ── Fixtures ────────────────────────────────────────────────────────

/// Invoker that records every call and echoes its arguments.
struct RecordingInvoker {
    calls: AtomicUsize,
}

impl RecordingInvoker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ToolInvoker for RecordingInvoker {
    async fn invoke(&self, tool: &str, arguments: Map<String, Value>) -> Result<Value, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({ "tool": tool, "echo": arguments }))
    }
}

fn write_policy_domain(dir: &Path) {
    let d = dir.join("founder_inbox");
    std::fs::create_dir_all(&d).unwrap();
    std::fs::write(
        d.join("policy.yaml"),
        "policy:\n  domain: founder_inbox\n  version: \"1.0\"\n  autonomy:\n    level: semi_auto\n  global_rules:\n    external_communication_requires_confirmation: true\n  default_fallback_decision: draft_reply\n",
    )
    .unwrap();
    std::fs::write(
        d.join("categories.yaml"),
        "categories:\n  investor:\n    allowed_decisions: [draft_reply, escalate]\n  internal:\n    allowed_decisions: [archive]\n",
    )
    .unwrap();
    std::fs::write(
        d.join("decisions.yaml"),
        "decisions:\n  draft_reply:\n    allowed_actions: [compose_email]\n    requires_confirmation: true\n  escalate:\n    allowed_actions: []\n    requires_confirmation: false\n  archive:\n    allowed_actions: [add_label]\n    requires_confirmation: false\n",
    )
    .unwrap();
    std::fs::write(
        d.join("actions.yaml"),
        "actions:\n  compose_email:\n    description: Draft a reply in the thread\n    external: true\n  add_label:\n    description: Label the thread\n    external: true\n",
    )
    .unwrap();
    std::fs::write(
        d.join("risk_rules.yaml"),
        "risk_levels: [low, medium, high]\nurgency_levels: [immediate, same_day, can_wait]\nrisk_urgency_matrix:\n  high:\n    allowed_urgency: [immediate, same_day]\n  low:\n    allowed_urgency: [same_day, can_wait]\n",
    )
    .unwrap();
}

fn compiled_policy(dir: &Path) -> Arc<CompiledPolicy> {
    let raw = PolicyLoader::new(dir).load_domain("founder_inbox").unwrap();
    Arc::new(
        PolicyCompiler::new(BindingSet::builtin())
            .compile(raw)
            .unwrap(),
    )
}

fn investor_email() -> EmailMessage {
    EmailMessage {
        sender: "ana@fundco.example".to_string(),
        recipient: "founder@startup.example".to_string(),
        subject: "Following up on our term sheet".to_string(),
        body: "Checking in on the revised terms. Could we get 30 minutes Thursday?".to_string(),
        thread_id: Some("thread-101".to_string()),
        attachments: vec![],
    }
}

fn candidate(decision: &str, actions: &[&str], needs_confirmation: bool) -> CandidateDecision {
    CandidateDecision {
        schema_version: SCHEMA_VERSION.to_string(),
        domain: "founder_inbox".to_string(),
        intent: "Investor follow-up on fundraising".to_string(),
        category: "investor".to_string(),
        urgency: "same_day".to_string(),
        risk_level: "high".to_string(),
        decision: decision.to_string(),
        proposed_actions: actions
            .iter()
            .map(|a| ProposedAction {
                action_type: a.to_string(),
                description: String::new(),
                target: "email".to_string(),
            })
            .collect(),
        action: None,
        needs_confirmation,
        confidence: 0.85,
        reasoning_summary: "Known investor asking for a concrete next step on timing.".to_string(),
        email_body: None,
    }
}

fn engine(
    policy: Arc<CompiledPolicy>,
    proposed: CandidateDecision,
    invoker: Arc<RecordingInvoker>,
) -> TriageEngine {
    TriageEngine::new(
        policy,
        Arc::new(ScriptedProposer::new(proposed).with_reply("Happy to chat Thursday.")),
        ExecutionDispatcher::new(invoker),
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn clean_internal_decision_executes_without_a_human() {
    let tmp = tempfile::tempdir().unwrap();
    write_policy_domain(tmp.path());
    let invoker = RecordingInvoker::new();
    let engine = engine(
        compiled_policy(tmp.path()),
        candidate("escalate", &[], false),
        invoker.clone(),
    );

    let outcome = engine.run(investor_email()).await.unwrap();
    let WorkflowOutcome::Completed(state) = outcome else {
        panic!("Expected completion");
    };
    assert_eq!(state.route, GateRoute::Execute);
    assert_eq!(state.validation.status, ValidationStatus::Approved);
    assert!(matches!(
        state.execution,
        Some(ExecutionOutcome::Skipped { .. })
    ));
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn external_reply_suspends_then_executes_once_on_approval() {
    let tmp = tempfile::tempdir().unwrap();
    write_policy_domain(tmp.path());
    let invoker = RecordingInvoker::new();
    let engine = engine(
        compiled_policy(tmp.path()),
        candidate("draft_reply", &["compose_email"], true),
        invoker.clone(),
    );

    let WorkflowOutcome::Suspended {
        workflow_id,
        snapshot,
    } = engine.run(investor_email()).await.unwrap()
    else {
        panic!("Expected suspension");
    };
    assert_eq!(snapshot.decision.decision_key, "draft_reply");
    assert_eq!(snapshot.policy_ref.domain, "founder_inbox");
    assert_eq!(snapshot.content_hash.len(), 64);
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);

    let outcome = engine
        .resume(workflow_id, ResumeSignal::approved(Some("send it")))
        .await
        .unwrap();
    let WorkflowOutcome::Completed(state) = outcome else {
        panic!("Expected completion");
    };
    match state.execution {
        Some(ExecutionOutcome::Invoked {
            ref tool,
            ref arguments,
            ..
        }) => {
            assert_eq!(tool, "gmail.reply_thread");
            assert_eq!(arguments["thread_id"], "thread-101");
            assert_eq!(arguments["body"], "Happy to chat Thursday.");
        }
        ref other => panic!("Expected Invoked, got {other:?}"),
    }
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);

    // A second approval of the same workflow must not execute again.
    assert!(
        engine
            .resume(workflow_id, ResumeSignal::approved(None))
            .await
            .is_err()
    );
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verdictless_resume_returns_the_same_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    write_policy_domain(tmp.path());
    let invoker = RecordingInvoker::new();
    let engine = engine(
        compiled_policy(tmp.path()),
        candidate("draft_reply", &["compose_email"], true),
        invoker.clone(),
    );

    let WorkflowOutcome::Suspended {
        workflow_id,
        snapshot,
    } = engine.run(investor_email()).await.unwrap()
    else {
        panic!("Expected suspension");
    };

    for _ in 0..2 {
        let WorkflowOutcome::Suspended { snapshot: again, .. } = engine
            .resume(workflow_id, ResumeSignal::pending())
            .await
            .unwrap()
        else {
            panic!("Expected re-suspension");
        };
        assert_eq!(again.content_hash, snapshot.content_hash);
    }
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn human_rejection_falls_back_and_never_executes() {
    let tmp = tempfile::tempdir().unwrap();
    write_policy_domain(tmp.path());
    let invoker = RecordingInvoker::new();
    let engine = engine(
        compiled_policy(tmp.path()),
        candidate("draft_reply", &["compose_email"], true),
        invoker.clone(),
    );

    let WorkflowOutcome::Suspended { workflow_id, .. } =
        engine.run(investor_email()).await.unwrap()
    else {
        panic!("Expected suspension");
    };

    let outcome = engine
        .resume(workflow_id, ResumeSignal::rejected(Some("wrong tone")))
        .await
        .unwrap();
    let WorkflowOutcome::Completed(state) = outcome else {
        panic!("Expected completion");
    };
    assert_eq!(state.route, GateRoute::Fallback);
    assert!(state.final_decision.proposed_actions.is_empty());
    assert_eq!(state.final_decision.confidence, 0.0);
    assert_eq!(state.context.human_comment.as_deref(), Some("wrong tone"));
    assert!(state.execution.is_none());
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn policy_violating_candidate_completes_on_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    write_policy_domain(tmp.path());
    let invoker = RecordingInvoker::new();
    // archive is not an allowed decision for the investor category.
    let engine = engine(
        compiled_policy(tmp.path()),
        candidate("archive", &["add_label"], false),
        invoker.clone(),
    );

    let outcome = engine.run(investor_email()).await.unwrap();
    let WorkflowOutcome::Completed(state) = outcome else {
        panic!("Expected completion");
    };
    assert_eq!(state.validation.status, ValidationStatus::Rejected);
    assert_eq!(state.route, GateRoute::Fallback);
    assert_eq!(state.final_decision.intent, "Manual review required");
    assert!(state.execution.is_none());
    // The raw candidate is preserved for audit.
    assert_eq!(state.candidate.decision, "archive");
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn downgraded_candidate_waits_for_a_human() {
    let tmp = tempfile::tempdir().unwrap();
    write_policy_domain(tmp.path());
    let invoker = RecordingInvoker::new();
    // Soft violation: thin reasoning. Everything else is in policy.
    let mut proposed = candidate("draft_reply", &["compose_email"], true);
    proposed.reasoning_summary = "Investor".to_string();
    let engine = engine(compiled_policy(tmp.path()), proposed, invoker.clone());

    let WorkflowOutcome::Suspended {
        workflow_id,
        snapshot,
    } = engine.run(investor_email()).await.unwrap()
    else {
        panic!("Expected suspension");
    };
    assert_eq!(snapshot.validation_status, ValidationStatus::Downgraded);
    assert!(snapshot.decision.needs_confirmation);

    // Approval still executes the (downgraded) decision exactly once.
    let outcome = engine
        .resume(workflow_id, ResumeSignal::approved(None))
        .await
        .unwrap();
    let WorkflowOutcome::Completed(state) = outcome else {
        panic!("Expected completion");
    };
    assert_eq!(state.validation.status, ValidationStatus::Downgraded);
    assert!(state.final_decision.confidence <= 0.5);
    assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);
}
