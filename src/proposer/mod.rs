//! Candidate decision proposer — the untrusted collaborator seam.
//!
//! Everything that produces a candidate (prompting, free-form reasoning,
//! schema coercion) lives behind `DecisionProposer`. The validator core has
//! zero dependency on how candidates are made, which keeps the whole
//! pipeline deterministic under test with scripted candidates.

pub mod llm;

use async_trait::async_trait;

use crate::decision::candidate::CandidateDecision;
use crate::error::ProposerError;
use crate::policy::summarizer::PolicySummary;
use crate::workflow::state::{EmailContext, EmailMessage};

pub use llm::{LlmBackend, LlmProposerConfig, create_llm_proposer};

/// External candidate-generation collaborator contract.
///
/// Output is untrusted: the validator checks every field against the
/// compiled policy and assumes nothing about this trait's implementations.
#[async_trait]
pub trait DecisionProposer: Send + Sync {
    /// Propose a candidate decision for one message, constrained (only by
    /// convention, never by trust) to the given policy summary.
    async fn propose(
        &self,
        summary: &PolicySummary,
        email: &EmailMessage,
        context: &EmailContext,
    ) -> Result<CandidateDecision, ProposerError>;

    /// Compose a reply body for a decision whose surviving actions include
    /// an email reply.
    async fn compose_reply(
        &self,
        summary: &PolicySummary,
        email: &EmailMessage,
        context: &EmailContext,
    ) -> Result<String, ProposerError>;
}

/// Proposer that returns fixed answers — deterministic tests and offline
/// demo runs.
pub struct ScriptedProposer {
    candidate: CandidateDecision,
    reply: String,
}

impl ScriptedProposer {
    pub fn new(candidate: CandidateDecision) -> Self {
        Self {
            candidate,
            reply: "Thanks for the note — I'll follow up shortly.".to_string(),
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = reply.to_string();
        self
    }
}

#[async_trait]
impl DecisionProposer for ScriptedProposer {
    async fn propose(
        &self,
        _summary: &PolicySummary,
        _email: &EmailMessage,
        _context: &EmailContext,
    ) -> Result<CandidateDecision, ProposerError> {
        Ok(self.candidate.clone())
    }

    async fn compose_reply(
        &self,
        _summary: &PolicySummary,
        _email: &EmailMessage,
        _context: &EmailContext,
    ) -> Result<String, ProposerError> {
        Ok(self.reply.clone())
    }
}
