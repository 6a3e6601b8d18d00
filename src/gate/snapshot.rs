//! Confirmation snapshot — the tamper-evident record behind every pending
//! approval.
//!
//! Created exactly once per human-confirmation request. The content hash is
//! SHA-256 over the canonical (key-sorted JSON) snapshot body, hex-encoded,
//! and doubles as the identifier a caller can use to verify that what it is
//! approving is what was suspended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::decision::candidate::ProposedAction;
use crate::decision::validator::{ValidationResult, ValidationStatus};
use crate::policy::model::CompiledPolicy;

/// Which policy the pending approval was evaluated under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub domain: String,
    pub version: String,
    pub autonomy: String,
}

/// The decision fields a human needs to see to approve or reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionExcerpt {
    pub decision_key: String,
    pub proposed_actions: Vec<ProposedAction>,
    pub risk_level: String,
    pub urgency: String,
    pub needs_confirmation: bool,
}

/// Immutable, hashed record of a pending human-confirmation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationSnapshot {
    pub policy_ref: PolicyRef,
    pub decision: DecisionExcerpt,
    pub validation_status: ValidationStatus,
    pub timestamp: DateTime<Utc>,
    /// SHA-256 over the canonicalized body (everything above this field).
    pub content_hash: String,
}

/// Hashable body — the snapshot minus its own hash.
#[derive(Serialize)]
struct SnapshotBody<'a> {
    policy_ref: &'a PolicyRef,
    decision: &'a DecisionExcerpt,
    validation_status: ValidationStatus,
    timestamp: DateTime<Utc>,
}

impl ConfirmationSnapshot {
    /// Capture a snapshot for a decision awaiting confirmation.
    pub fn capture(policy: &CompiledPolicy, validation: &ValidationResult) -> Self {
        let final_decision = &validation.final_decision;
        let policy_ref = PolicyRef {
            domain: policy.domain.clone(),
            version: policy.version.clone(),
            autonomy: policy.autonomy.label().to_string(),
        };
        let decision = DecisionExcerpt {
            decision_key: final_decision.decision.clone(),
            proposed_actions: final_decision.proposed_actions.clone(),
            risk_level: final_decision.risk_level.clone(),
            urgency: final_decision.urgency.clone(),
            needs_confirmation: final_decision.needs_confirmation,
        };
        let timestamp = Utc::now();

        let content_hash = hash_canonical(&SnapshotBody {
            policy_ref: &policy_ref,
            decision: &decision,
            validation_status: validation.status,
            timestamp,
        });

        Self {
            policy_ref,
            decision,
            validation_status: validation.status,
            timestamp,
            content_hash,
        }
    }
}

/// SHA-256 of a value's canonical JSON form, lowercase hex.
///
/// Canonicalization goes through `serde_json::Value`, whose object map is
/// ordered, so key order in the source struct cannot change the hash.
fn hash_canonical<T: Serialize>(body: &T) -> String {
    let value = serde_json::to_value(body).unwrap_or(serde_json::Value::Null);
    let canonical = value.to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
