//! Policy summarizer — the only policy view exposed to the proposer.
//!
//! A deterministic projection of the compiled policy into the minimal
//! constraint surface the candidate-generation collaborator needs. Principle
//! of least disclosure: no autonomy level, no invocation bindings, no risk
//! matrix internals. The same compiled policy always yields a byte-identical
//! summary (all maps are ordered).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::policy::model::{CompiledPolicy, GlobalRules};

/// Decision-constraint surface handed to the candidate proposer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySummary {
    pub domain: String,
    pub policy_version: String,
    pub allowed_categories: Vec<String>,
    pub urgency_levels: Vec<String>,
    pub risk_levels: Vec<String>,
    /// category → allowed decisions
    pub category_decision_map: BTreeMap<String, Vec<String>>,
    /// decision → allowed action types
    pub decision_action_map: BTreeMap<String, Vec<String>>,
    /// decision → requires_confirmation
    pub decision_confirmation_map: BTreeMap<String, bool>,
    pub global_rules: GlobalRules,
    pub default_fallback_decision: String,
}

/// Projects compiled policies into proposer-safe summaries.
pub struct PolicySummarizer;

impl PolicySummarizer {
    /// Pure projection; no field the proposer does not need.
    pub fn summarize(policy: &CompiledPolicy) -> PolicySummary {
        PolicySummary {
            domain: policy.domain.clone(),
            policy_version: policy.version.clone(),
            allowed_categories: policy.categories.keys().cloned().collect(),
            urgency_levels: policy.urgency_levels.clone(),
            risk_levels: policy.risk_levels.clone(),
            category_decision_map: policy
                .categories
                .iter()
                .map(|(category, cfg)| (category.clone(), cfg.allowed_decisions.clone()))
                .collect(),
            decision_action_map: policy
                .decisions
                .iter()
                .map(|(decision, cfg)| (decision.clone(), cfg.allowed_actions.clone()))
                .collect(),
            decision_confirmation_map: policy
                .decisions
                .iter()
                .map(|(decision, cfg)| (decision.clone(), cfg.requires_confirmation))
                .collect(),
            global_rules: policy.global_rules.clone(),
            default_fallback_decision: policy.default_fallback_decision.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model::tests::test_policy;

    #[test]
    fn summary_projects_maps() {
        let policy = test_policy();
        let summary = PolicySummarizer::summarize(&policy);

        assert_eq!(summary.domain, "founder_inbox");
        assert_eq!(summary.allowed_categories, vec!["investor"]);
        assert_eq!(
            summary.category_decision_map["investor"],
            vec!["draft_reply", "escalate"]
        );
        assert_eq!(
            summary.decision_action_map["draft_reply"],
            vec!["compose_email"]
        );
        assert!(summary.decision_confirmation_map["draft_reply"]);
        assert!(!summary.decision_confirmation_map["escalate"]);
    }

    #[test]
    fn summary_is_byte_deterministic() {
        let policy = test_policy();
        let a = serde_json::to_string(&PolicySummarizer::summarize(&policy)).unwrap();
        let b = serde_json::to_string(&PolicySummarizer::summarize(&policy)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn summary_discloses_no_autonomy_or_bindings() {
        let policy = test_policy();
        let summary = serde_json::to_value(PolicySummarizer::summarize(&policy)).unwrap();
        let obj = summary.as_object().unwrap();
        assert!(!obj.contains_key("autonomy"));
        assert!(!obj.contains_key("actions"));
        assert!(!obj.contains_key("risk_urgency_matrix"));
    }
}
