//! Policy data model — raw document shapes and the compiled form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::policy::bindings::InvocationBinding;

// ── Autonomy ────────────────────────────────────────────────────────

/// Policy-wide ceiling on automatic execution.
///
/// `ManualOnly` is the default when the policy document is silent — an
/// unspecified autonomy level must never widen what the system may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    /// Every decision pauses for a human, regardless of its own flags.
    #[default]
    ManualOnly,
    /// Decisions execute automatically unless they require confirmation.
    SemiAuto,
    /// Same routing as `SemiAuto` today; reserved for future widening.
    FullAuto,
}

impl AutonomyLevel {
    /// Short label for logging and snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ManualOnly => "manual_only",
            Self::SemiAuto => "semi_auto",
            Self::FullAuto => "full_auto",
        }
    }
}

// ── Raw documents ───────────────────────────────────────────────────

/// `policy.yaml` — domain metadata, autonomy, global rules.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyMetaDoc {
    pub policy: PolicyMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyMeta {
    pub domain: String,
    pub version: String,
    #[serde(default)]
    pub autonomy: Option<AutonomySection>,
    #[serde(default)]
    pub global_rules: GlobalRules,
    pub default_fallback_decision: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutonomySection {
    #[serde(default)]
    pub level: Option<AutonomyLevel>,
}

/// Domain-wide rules that apply on top of per-decision settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRules {
    /// When set, a decision the policy marks `requires_confirmation` can
    /// never self-attest `needs_confirmation: false`.
    #[serde(default)]
    pub external_communication_requires_confirmation: bool,
}

/// `categories.yaml` — message classifications and their legal decisions.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoriesDoc {
    pub categories: BTreeMap<String, CategoryPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    pub allowed_decisions: Vec<String>,
}

/// `decisions.yaml` — named outcomes, their legal actions, confirmation flags.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionsDoc {
    pub decisions: BTreeMap<String, DecisionPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    #[serde(default)]
    pub allowed_actions: Vec<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
}

/// `actions.yaml` — concrete effects a decision may trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionsDoc {
    pub actions: BTreeMap<String, RawAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAction {
    #[serde(default)]
    pub description: String,
    /// External actions reach another system and must carry an invocation
    /// binding by the time compilation finishes.
    #[serde(default)]
    pub external: bool,
}

/// `risk_rules.yaml` — risk/urgency vocabulary and coherence matrix.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskRulesDoc {
    pub risk_levels: Vec<String>,
    pub urgency_levels: Vec<String>,
    pub risk_urgency_matrix: BTreeMap<String, RiskUrgencyRule>,
    #[serde(default)]
    pub risk_constraints: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskUrgencyRule {
    pub allowed_urgency: Vec<String>,
}

/// The five raw documents for one domain, as produced by the loader.
#[derive(Debug, Clone)]
pub struct RawPolicySet {
    pub policy: PolicyMetaDoc,
    pub categories: CategoriesDoc,
    pub decisions: DecisionsDoc,
    pub actions: ActionsDoc,
    pub risk_rules: RiskRulesDoc,
}

// ── Compiled policy ─────────────────────────────────────────────────

/// An action with its invocation binding resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ActionPolicy {
    pub description: String,
    pub external: bool,
    /// Present for every external action (the compiler guarantees it);
    /// `None` means the action is internal and produces no external effect.
    pub invocation: Option<InvocationBinding>,
}

/// Immutable compiled policy for one domain+version.
///
/// Produced only by `PolicyCompiler::compile`, which fails closed — if this
/// value exists, every category→decision and decision→action reference
/// resolves, and every external action has a binding. Safe for concurrent
/// read-only access; shared across workflow instances behind an `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledPolicy {
    pub domain: String,
    pub version: String,
    pub autonomy: AutonomyLevel,
    pub categories: BTreeMap<String, CategoryPolicy>,
    pub decisions: BTreeMap<String, DecisionPolicy>,
    pub actions: BTreeMap<String, ActionPolicy>,
    pub risk_levels: Vec<String>,
    pub urgency_levels: Vec<String>,
    pub risk_urgency_matrix: BTreeMap<String, RiskUrgencyRule>,
    pub risk_constraints: BTreeMap<String, serde_json::Value>,
    pub global_rules: GlobalRules,
    pub default_fallback_decision: String,
}

impl CompiledPolicy {
    /// Is `decision` in the allowed set for `category`?
    ///
    /// Unknown categories answer `false` — the validator reports them
    /// separately as `UnknownCategory`.
    pub fn decision_allowed_for_category(&self, category: &str, decision: &str) -> bool {
        self.categories
            .get(category)
            .map(|c| c.allowed_decisions.iter().any(|d| d == decision))
            .unwrap_or(false)
    }

    /// Does the policy mandate confirmation for `decision`?
    pub fn decision_requires_confirmation(&self, decision: &str) -> bool {
        self.decisions
            .get(decision)
            .map(|d| d.requires_confirmation)
            .unwrap_or(false)
    }

    /// Are all of `action_types` in the allowed set for `decision`?
    pub fn actions_allowed_for_decision(&self, decision: &str, action_types: &[&str]) -> bool {
        let Some(policy) = self.decisions.get(decision) else {
            return action_types.is_empty();
        };
        action_types
            .iter()
            .all(|a| policy.allowed_actions.iter().any(|allowed| allowed == a))
    }

    /// Is `urgency` coherent with `risk` per the risk-urgency matrix?
    ///
    /// A risk level absent from the matrix allows no urgency at all.
    pub fn risk_urgency_coherent(&self, risk: &str, urgency: &str) -> bool {
        self.risk_urgency_matrix
            .get(risk)
            .map(|rule| rule.allowed_urgency.iter().any(|u| u == urgency))
            .unwrap_or(false)
    }
}
