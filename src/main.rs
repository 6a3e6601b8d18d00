use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use inbox_warden::config::WardenConfig;
use inbox_warden::decision::{
    CandidateDecision, DecisionValidator, ProposedAction, SCHEMA_VERSION,
};
use inbox_warden::executor::{ExecutionDispatcher, InvokeError, ToolRouter, ToolService};
use inbox_warden::gate::ResumeSignal;
use inbox_warden::policy::{BindingSet, PolicyCompiler, PolicyLoader};
use inbox_warden::proposer::{
    DecisionProposer, LlmBackend, LlmProposerConfig, ScriptedProposer, create_llm_proposer,
};
use inbox_warden::workflow::{EmailMessage, TriageEngine, WorkflowOutcome};

/// Demo service that logs calls instead of reaching a real mailbox.
struct LoggingService {
    name: &'static str,
}

#[async_trait]
impl ToolService for LoggingService {
    fn name(&self) -> &str {
        self.name
    }

    async fn call(
        &self,
        method: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, InvokeError> {
        let rendered = Value::Object(arguments.clone());
        tracing::info!(
            service = self.name,
            method = method,
            arguments = %rendered,
            "Demo tool call"
        );
        Ok(serde_json::json!({ "ok": true, "service": self.name, "method": method }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WardenConfig::from_env();

    eprintln!("📬 Inbox Warden v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Policies: {}", config.policies_dir.display());
    eprintln!("   Domain: {}", config.default_domain);

    // Compile the policy up front. Any broken reference is fatal here,
    // before a single email is touched.
    let loader = PolicyLoader::new(&config.policies_dir);
    let raw = loader.load_domain(&config.default_domain)?;
    let policy = Arc::new(PolicyCompiler::new(BindingSet::builtin()).compile(raw)?);
    eprintln!(
        "   Policy: v{} ({} categories, {} decisions, {} actions)",
        policy.version,
        policy.categories.len(),
        policy.decisions.len(),
        policy.actions.len()
    );

    // Candidate proposer: real LLM when a key is present, scripted otherwise.
    let proposer: Arc<dyn DecisionProposer> = match std::env::var("ANTHROPIC_API_KEY") {
        Ok(api_key) => {
            let model = std::env::var("WARDEN_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
            eprintln!("   Proposer: Anthropic ({model})");
            create_llm_proposer(&LlmProposerConfig {
                backend: LlmBackend::Anthropic,
                api_key: secrecy::SecretString::from(api_key),
                model,
            })?
        }
        Err(_) => {
            eprintln!("   Proposer: scripted demo (set ANTHROPIC_API_KEY for a real one)");
            Arc::new(ScriptedProposer::new(demo_candidate(&policy.domain)))
        }
    };

    // Demo tool services; a real deployment registers MCP-backed ones.
    let router = Arc::new(ToolRouter::new());
    router.register(Arc::new(LoggingService { name: "gmail" })).await;
    router
        .register(Arc::new(LoggingService { name: "calendar" }))
        .await;

    let engine = TriageEngine::new(policy, proposer, ExecutionDispatcher::new(router))
        .with_validator(
            DecisionValidator::new().with_min_reasoning_len(config.min_reasoning_len),
        );

    eprintln!("\n   Triaging demo email...\n");
    let outcome = engine.run(demo_email()).await?;

    match outcome {
        WorkflowOutcome::Completed(state) => {
            eprintln!(
                "✅ Completed: decision={} route={:?}",
                state.final_decision.decision, state.route
            );
            if let Some(execution) = &state.execution {
                eprintln!("   Execution: {}", serde_json::to_string_pretty(execution)?);
            }
        }
        WorkflowOutcome::Suspended {
            workflow_id,
            snapshot,
        } => {
            eprintln!("⏸  Awaiting confirmation (workflow {workflow_id})");
            eprintln!("   Decision: {}", snapshot.decision.decision_key);
            eprintln!("   Snapshot: {}", snapshot.content_hash);
            eprint!("   Approve? [y/N] ");

            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            let signal = if line.trim().eq_ignore_ascii_case("y") {
                ResumeSignal::approved(None)
            } else {
                ResumeSignal::rejected(None)
            };

            match engine.resume(workflow_id, signal).await? {
                WorkflowOutcome::Completed(state) => {
                    eprintln!(
                        "✅ Resumed: decision={} route={:?}",
                        state.final_decision.decision, state.route
                    );
                    if let Some(execution) = &state.execution {
                        eprintln!("   Execution: {}", serde_json::to_string_pretty(execution)?);
                    }
                }
                WorkflowOutcome::Suspended { .. } => {
                    eprintln!("⏸  Still suspended");
                }
            }
        }
    }

    Ok(())
}

fn demo_email() -> EmailMessage {
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

fn demo_candidate(domain: &str) -> CandidateDecision {
    CandidateDecision {
        schema_version: SCHEMA_VERSION.to_string(),
        domain: domain.to_string(),
        intent: "Investor follow-up on fundraising".to_string(),
        category: "investor".to_string(),
        urgency: "same_day".to_string(),
        risk_level: "high".to_string(),
        decision: "draft_reply".to_string(),
        proposed_actions: vec![ProposedAction {
            action_type: "compose_email".to_string(),
            description: "Reply to the investor thread".to_string(),
            target: "email".to_string(),
        }],
        action: None,
        needs_confirmation: true,
        confidence: 0.85,
        reasoning_summary: "Known investor asking for a concrete next step on timing.".to_string(),
        email_body: None,
    }
}
