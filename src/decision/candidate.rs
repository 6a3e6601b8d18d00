//! Candidate decision — the proposer's output, untrusted until validated.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The one candidate schema version this build accepts.
pub const SCHEMA_VERSION: &str = "v1";

/// Fields a candidate must carry to be considered at all.
const REQUIRED_FIELDS: &[&str] = &[
    "schema_version",
    "domain",
    "intent",
    "category",
    "urgency",
    "risk_level",
    "decision",
    "proposed_actions",
    "needs_confirmation",
    "confidence",
    "reasoning_summary",
];

/// One concrete effect the candidate proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Action type; must be allowed by policy for the chosen decision.
    pub action_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_target() -> String {
    "email".to_string()
}

/// A decision-shaped payload produced by the external proposer.
///
/// Nothing here is trusted: the validator checks every field against the
/// compiled policy before anything downstream may act on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDecision {
    pub schema_version: String,
    pub domain: String,
    pub intent: String,
    pub category: String,
    pub urgency: String,
    pub risk_level: String,
    pub decision: String,
    pub proposed_actions: Vec<ProposedAction>,
    /// Primary action to execute, derived from the first proposed action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub needs_confirmation: bool,
    pub confidence: f64,
    pub reasoning_summary: String,
    /// Reply body composed after validation, when a compose action survives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
}

impl CandidateDecision {
    /// Parse a raw JSON value from the untrusted boundary.
    ///
    /// Reports the first missing required field by name so the caller can
    /// surface a precise input error, then deserializes.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SchemaError> {
        let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;
        for field in REQUIRED_FIELDS {
            if !obj.contains_key(*field) {
                return Err(SchemaError::MissingField((*field).to_string()));
            }
        }
        serde_json::from_value(value.clone()).map_err(|e| SchemaError::Malformed(e.to_string()))
    }

    /// Schema integrity for an already-typed candidate: supported version
    /// and a confidence inside [0, 1]. Fatal on failure — this is a
    /// malformed collaborator output, not a policy violation.
    pub fn check_schema(&self) -> Result<(), SchemaError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                found: self.schema_version.clone(),
                expected: SCHEMA_VERSION.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SchemaError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }

    /// Derive the primary action from the proposed sequence.
    ///
    /// One primary action per decision: the first proposed action wins; an
    /// empty sequence is an explicit no-op (`action = None`), which matters
    /// for dispatch determinism.
    pub fn derive_primary_action(&mut self) -> Result<(), SchemaError> {
        match self.proposed_actions.first() {
            None => {
                self.action = None;
                Ok(())
            }
            Some(primary) if primary.action_type.is_empty() => Err(SchemaError::MissingActionType),
            Some(primary) => {
                self.action = Some(primary.action_type.clone());
                Ok(())
            }
        }
    }

    /// Action types of all proposed actions, for policy checks.
    pub fn proposed_action_types(&self) -> Vec<&str> {
        self.proposed_actions
            .iter()
            .map(|a| a.action_type.as_str())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A well-formed candidate coherent with `policy::model::tests::test_policy`.
    pub(crate) fn test_candidate() -> CandidateDecision {
        CandidateDecision {
            schema_version: SCHEMA_VERSION.to_string(),
            domain: "founder_inbox".into(),
            intent: "Investor follow-up on fundraising".into(),
            category: "investor".into(),
            urgency: "same_day".into(),
            risk_level: "high".into(),
            decision: "draft_reply".into(),
            proposed_actions: vec![ProposedAction {
                action_type: "compose_email".into(),
                description: "Reply to the investor thread".into(),
                target: "email".into(),
            }],
            action: None,
            needs_confirmation: true,
            confidence: 0.9,
            reasoning_summary: "Known investor asking for a concrete next step on timing.".into(),
            email_body: None,
        }
    }

    #[test]
    fn from_value_accepts_complete_candidate() {
        let value = serde_json::to_value(test_candidate()).unwrap();
        let parsed = CandidateDecision::from_value(&value).unwrap();
        assert_eq!(parsed.decision, "draft_reply");
    }

    #[test]
    fn from_value_names_first_missing_field() {
        let mut value = serde_json::to_value(test_candidate()).unwrap();
        value.as_object_mut().unwrap().remove("risk_level");
        let err = CandidateDecision::from_value(&value).unwrap_err();
        match err {
            SchemaError::MissingField(field) => assert_eq!(field, "risk_level"),
            other => panic!("Expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn from_value_rejects_non_object() {
        let err = CandidateDecision::from_value(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject));
    }

    #[test]
    fn check_schema_rejects_wrong_version() {
        let mut candidate = test_candidate();
        candidate.schema_version = "v2".into();
        let err = candidate.check_schema().unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedVersion { .. }));
    }

    #[test]
    fn check_schema_rejects_confidence_out_of_range() {
        let mut candidate = test_candidate();
        candidate.confidence = 1.2;
        assert!(matches!(
            candidate.check_schema(),
            Err(SchemaError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn primary_action_is_first_proposed() {
        let mut candidate = test_candidate();
        candidate.derive_primary_action().unwrap();
        assert_eq!(candidate.action.as_deref(), Some("compose_email"));
    }

    #[test]
    fn no_proposed_actions_is_explicit_noop() {
        let mut candidate = test_candidate();
        candidate.proposed_actions.clear();
        candidate.action = Some("stale".into());
        candidate.derive_primary_action().unwrap();
        assert_eq!(candidate.action, None);
    }

    #[test]
    fn empty_action_type_is_a_schema_error() {
        let mut candidate = test_candidate();
        candidate.proposed_actions[0].action_type.clear();
        assert!(matches!(
            candidate.derive_primary_action(),
            Err(SchemaError::MissingActionType)
        ));
    }
}
