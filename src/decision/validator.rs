//! Decision validator — deterministic, multi-layer, fail-safe.
//!
//! Five ordered check layers. Schema integrity is fatal and halts
//! immediately; every other layer runs regardless of earlier findings, so
//! violations accumulate instead of short-circuiting. Resolution is
//! three-tier: approved, downgraded (soft findings only), rejected (any hard
//! finding). Violations are data, never errors — the caller always gets a
//! concrete final decision it may safely act on.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::candidate::{CandidateDecision, SCHEMA_VERSION};
use crate::error::SchemaError;
use crate::policy::model::CompiledPolicy;

/// Default minimum trimmed length for a candidate's reasoning summary.
const DEFAULT_MIN_REASONING_LEN: usize = 20;

/// Annotation appended to a downgraded decision's reasoning.
const DOWNGRADE_NOTE: &str = " (Decision downgraded by validator.)";

// ── Violations ──────────────────────────────────────────────────────

/// A named deterministic check failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    DomainMismatch,
    UnknownCategory,
    DecisionNotAllowedForCategory,
    RiskUrgencyMismatch,
    ActionNotAllowedForDecision,
    ConfirmationRequired,
    WeakReasoning,
}

impl Violation {
    /// Hard violations reject the candidate wholesale; soft ones downgrade.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            Self::DomainMismatch
                | Self::UnknownCategory
                | Self::DecisionNotAllowedForCategory
                | Self::ActionNotAllowedForDecision
        )
    }

    /// Stable wire/display code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DomainMismatch => "DOMAIN_MISMATCH",
            Self::UnknownCategory => "UNKNOWN_CATEGORY",
            Self::DecisionNotAllowedForCategory => "DECISION_NOT_ALLOWED_FOR_CATEGORY",
            Self::RiskUrgencyMismatch => "RISK_URGENCY_MISMATCH",
            Self::ActionNotAllowedForDecision => "ACTION_NOT_ALLOWED_FOR_DECISION",
            Self::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            Self::WeakReasoning => "WEAK_REASONING",
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ── Result ──────────────────────────────────────────────────────────

/// Validator resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Approved,
    Downgraded,
    Rejected,
}

impl ValidationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Downgraded => "downgraded",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome of validating one candidate. Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    /// The decision downstream stages act on. Never the raw candidate when
    /// rejected — always the policy's fixed fallback payload.
    pub final_decision: CandidateDecision,
    pub violations: Vec<Violation>,
    pub notes: Option<String>,
}

// ── Validator ───────────────────────────────────────────────────────

/// Deterministic verifier of candidate decisions against a compiled policy.
pub struct DecisionValidator {
    min_reasoning_len: usize,
}

impl Default for DecisionValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionValidator {
    pub fn new() -> Self {
        Self {
            min_reasoning_len: DEFAULT_MIN_REASONING_LEN,
        }
    }

    pub fn with_min_reasoning_len(mut self, len: usize) -> Self {
        self.min_reasoning_len = len;
        self
    }

    /// Validate a candidate against the policy.
    ///
    /// Returns `Err(SchemaError)` only for layer-1 failures (malformed
    /// collaborator output). Every policy finding is reported as data.
    pub fn validate(
        &self,
        candidate: &CandidateDecision,
        policy: &CompiledPolicy,
    ) -> Result<ValidationResult, SchemaError> {
        // Layer 1: schema integrity — fatal, halts immediately.
        candidate.check_schema()?;

        let mut violations = Vec::new();

        // Layer 2: domain & category.
        if candidate.domain != policy.domain {
            violations.push(Violation::DomainMismatch);
        }
        if !policy.categories.contains_key(&candidate.category) {
            violations.push(Violation::UnknownCategory);
        } else if !policy.decision_allowed_for_category(&candidate.category, &candidate.decision) {
            violations.push(Violation::DecisionNotAllowedForCategory);
        }

        // Layer 3: risk/urgency coherence.
        if !policy.risk_urgency_coherent(&candidate.risk_level, &candidate.urgency) {
            violations.push(Violation::RiskUrgencyMismatch);
        }

        // Layer 4: action safety.
        if !policy
            .actions_allowed_for_decision(&candidate.decision, &candidate.proposed_action_types())
        {
            violations.push(Violation::ActionNotAllowedForDecision);
        }
        // The candidate may never self-attest away a mandatory confirmation.
        if policy.global_rules.external_communication_requires_confirmation
            && policy.decision_requires_confirmation(&candidate.decision)
            && !candidate.needs_confirmation
        {
            violations.push(Violation::ConfirmationRequired);
        }

        // Layer 5: reasoning quality.
        if candidate.reasoning_summary.trim().len() < self.min_reasoning_len {
            violations.push(Violation::WeakReasoning);
        }

        Ok(self.resolve(candidate, policy, violations))
    }

    fn resolve(
        &self,
        candidate: &CandidateDecision,
        policy: &CompiledPolicy,
        violations: Vec<Violation>,
    ) -> ValidationResult {
        if violations.is_empty() {
            debug!(decision = %candidate.decision, "Candidate approved as-is");
            return ValidationResult {
                status: ValidationStatus::Approved,
                final_decision: candidate.clone(),
                violations,
                notes: None,
            };
        }

        if violations.iter().any(Violation::is_hard) {
            warn!(
                decision = %candidate.decision,
                violations = %join_codes(&violations),
                "Candidate rejected, substituting policy fallback"
            );
            return ValidationResult {
                status: ValidationStatus::Rejected,
                final_decision: Self::fallback(policy),
                violations,
                notes: Some("Validator rejected unsafe or invalid decision".to_string()),
            };
        }

        warn!(
            decision = %candidate.decision,
            violations = %join_codes(&violations),
            "Candidate downgraded by policy safety rules"
        );
        ValidationResult {
            status: ValidationStatus::Downgraded,
            final_decision: Self::downgrade(candidate, policy),
            violations,
            notes: Some("Decision downgraded due to policy safety rules".to_string()),
        }
    }

    /// The fixed fallback payload: low risk, no actions, zero confidence,
    /// naming the policy's default fallback decision. Deterministic and
    /// independent of candidate content.
    pub(crate) fn fallback(policy: &CompiledPolicy) -> CandidateDecision {
        CandidateDecision {
            schema_version: SCHEMA_VERSION.to_string(),
            domain: policy.domain.clone(),
            intent: "Manual review required".to_string(),
            category: "internal".to_string(),
            urgency: "can_wait".to_string(),
            risk_level: "low".to_string(),
            decision: policy.default_fallback_decision.clone(),
            proposed_actions: Vec::new(),
            action: None,
            needs_confirmation: false,
            confidence: 0.0,
            reasoning_summary: "Validator blocked the original decision due to policy violations."
                .to_string(),
            email_body: None,
        }
    }

    /// Coerce a soft-violating candidate to the least irreversible path:
    /// conservative decision, mandatory confirmation, capped confidence.
    fn downgrade(candidate: &CandidateDecision, policy: &CompiledPolicy) -> CandidateDecision {
        let mut downgraded = candidate.clone();
        downgraded.decision = policy.default_fallback_decision.clone();
        downgraded.needs_confirmation = true;
        downgraded.confidence = candidate.confidence.min(0.5);
        downgraded.reasoning_summary.push_str(DOWNGRADE_NOTE);
        downgraded
    }
}

fn join_codes(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::code)
        .collect::<Vec<_>>()
        .join(", ")
}
