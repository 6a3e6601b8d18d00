//! LLM-backed candidate proposer.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! The model is prompted with the policy summary and the raw email, and must
//! answer with a single JSON object in the candidate schema. Its output is
//! parsed here and then handed to the validator untrusted.

use std::sync::Arc;

use async_trait::async_trait;
use rig::agent::{Agent, AgentBuilder};
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::decision::candidate::{CandidateDecision, SCHEMA_VERSION};
use crate::error::ProposerError;
use crate::policy::summarizer::PolicySummary;
use crate::proposer::DecisionProposer;
use crate::workflow::state::{EmailContext, EmailMessage};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating an LLM proposer.
#[derive(Debug, Clone)]
pub struct LlmProposerConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM-backed proposer from configuration.
pub fn create_llm_proposer(
    config: &LlmProposerConfig,
) -> Result<Arc<dyn DecisionProposer>, ProposerError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_proposer(config),
        LlmBackend::OpenAi => create_openai_proposer(config),
    }
}

fn create_anthropic_proposer(
    config: &LlmProposerConfig,
) -> Result<Arc<dyn DecisionProposer>, ProposerError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            ProposerError::RequestFailed(format!("Failed to create Anthropic client: {}", e))
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic proposer (model: {})", config.model);
    Ok(Arc::new(RigProposer::new(model, &config.model)))
}

fn create_openai_proposer(
    config: &LlmProposerConfig,
) -> Result<Arc<dyn DecisionProposer>, ProposerError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            ProposerError::RequestFailed(format!("Failed to create OpenAI client: {}", e))
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI proposer (model: {})", config.model);
    Ok(Arc::new(RigProposer::new(model, &config.model)))
}

// ── rig-backed proposer ─────────────────────────────────────────────

/// Proposer wrapping a rig completion model behind a prompt/parse loop.
pub struct RigProposer<M: CompletionModel> {
    agent: Agent<M>,
    model_name: String,
}

impl<M: CompletionModel> RigProposer<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        let agent = AgentBuilder::new(model)
            .preamble(
                "You are the candidate-decision stage of a policy-gated email \
                 triage system. You only ever answer with a single JSON object. \
                 Your answer is checked against policy by a separate validator; \
                 stay strictly within the constraints you are given.",
            )
            .temperature(0.1)
            .build();
        Self {
            agent,
            model_name: model_name.to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl<M: CompletionModel> DecisionProposer for RigProposer<M> {
    async fn propose(
        &self,
        summary: &PolicySummary,
        email: &EmailMessage,
        context: &EmailContext,
    ) -> Result<CandidateDecision, ProposerError> {
        let prompt = build_triage_prompt(summary, email, context);
        debug!(
            model = %self.model_name,
            domain = %summary.domain,
            "Requesting candidate decision"
        );

        let raw = self
            .agent
            .prompt(prompt)
            .await
            .map_err(|e| ProposerError::RequestFailed(e.to_string()))?;

        Ok(parse_candidate(&raw)?)
    }

    async fn compose_reply(
        &self,
        summary: &PolicySummary,
        email: &EmailMessage,
        context: &EmailContext,
    ) -> Result<String, ProposerError> {
        let prompt = build_reply_prompt(summary, email, context);
        debug!(model = %self.model_name, "Requesting reply draft");

        let raw = self
            .agent
            .prompt(prompt)
            .await
            .map_err(|e| ProposerError::RequestFailed(e.to_string()))?;

        let body = raw.trim();
        if body.is_empty() {
            return Err(ProposerError::InvalidOutput(
                "empty reply draft".to_string(),
            ));
        }
        Ok(body.to_string())
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the triage prompt: policy constraints, the schema contract, then
/// the message itself.
fn build_triage_prompt(
    summary: &PolicySummary,
    email: &EmailMessage,
    context: &EmailContext,
) -> String {
    let constraints = serde_json::to_string_pretty(summary)
        .unwrap_or_else(|_| "{}".to_string());

    let mut prompt = String::with_capacity(2048);
    prompt.push_str("Classify the email below under these policy constraints:\n\n");
    prompt.push_str(&constraints);
    prompt.push_str("\n\nRespond with ONLY a JSON object with exactly these fields:\n");
    prompt.push_str(&format!(
        "{{\"schema_version\": \"{SCHEMA_VERSION}\", \"domain\": \"...\", \"intent\": \"...\", \
         \"category\": \"...\", \"urgency\": \"...\", \"risk_level\": \"...\", \
         \"decision\": \"...\", \"proposed_actions\": [{{\"action_type\": \"...\", \
         \"description\": \"...\", \"target\": \"email\"}}], \"needs_confirmation\": true, \
         \"confidence\": 0.0, \"reasoning_summary\": \"...\"}}\n\n"
    ));
    prompt.push_str(
        "Rules:\n\
         - category must be one of allowed_categories\n\
         - decision must be allowed for that category per category_decision_map\n\
         - every proposed action_type must be allowed for the decision per decision_action_map\n\
         - urgency and risk_level must come from the listed levels\n\
         - set needs_confirmation to true whenever the decision requires it or any action leaves the system\n\
         - reasoning_summary must be a specific, substantive sentence about this email\n\
         - confidence above 0.8 only for straightforward classifications\n\n",
    );
    push_email_section(&mut prompt, email, context);
    prompt
}

/// Build the reply-drafting prompt for an approved email reply.
fn build_reply_prompt(
    summary: &PolicySummary,
    email: &EmailMessage,
    context: &EmailContext,
) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&format!(
        "Draft a reply on behalf of the owner of the '{}' inbox.\n",
        summary.domain
    ));
    prompt.push_str(
        "Respond with ONLY the reply body as plain text. No subject line, no \
         signature placeholders, no JSON. Sound natural, not robotic.\n\n",
    );
    if let Some(ref comment) = context.human_comment {
        prompt.push_str(&format!("Guidance from the owner: {comment}\n\n"));
    }
    push_email_section(&mut prompt, email, context);
    prompt
}

fn push_email_section(prompt: &mut String, email: &EmailMessage, context: &EmailContext) {
    prompt.push_str(&format!("From: {}\n", email.sender));
    prompt.push_str(&format!("To: {}\n", email.recipient));
    prompt.push_str(&format!("Subject: {}\n", email.subject));
    if let Some(ref thread_id) = context.thread_id {
        prompt.push_str(&format!("Thread: {thread_id}\n"));
    }
    if !email.attachments.is_empty() {
        prompt.push_str(&format!("Attachments: {}\n", email.attachments.join(", ")));
    }

    // Body truncated for token efficiency.
    let body_preview: String = email.body.chars().take(2000).collect();
    prompt.push_str(&format!("\nEmail:\n{body_preview}"));
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse raw model output into a candidate: unwrap any markdown, parse the
/// JSON, then apply the candidate schema's required-field checks.
fn parse_candidate(raw: &str) -> Result<CandidateDecision, ProposerError> {
    let json_str = extract_json_object(raw);
    let value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| ProposerError::InvalidOutput(format!("JSON parse error: {e}")))?;
    Ok(CandidateDecision::from_value(&value)?)
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
