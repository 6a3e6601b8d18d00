//! Policy compiler — raw documents in, immutable `CompiledPolicy` out.
//!
//! Compilation is pure: it never touches the network or the filesystem.
//! It fails closed on the first broken reference, so a `CompiledPolicy`
//! always satisfies referential closure and every external action carries an
//! invocation binding. An unreachable action can therefore never be selected
//! by a downstream decision — that class of error dies here, at compile
//! time, not at execution time.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::PolicyError;
use crate::policy::bindings::BindingSet;
use crate::policy::model::{
    ActionPolicy, ActionsDoc, AutonomyLevel, CategoriesDoc, CompiledPolicy, DecisionsDoc,
    RawPolicySet,
};

/// Compiles raw policy document sets against an injected binding set.
pub struct PolicyCompiler {
    bindings: BindingSet,
}

impl PolicyCompiler {
    pub fn new(bindings: BindingSet) -> Self {
        Self { bindings }
    }

    /// Compile a raw document set into an immutable policy.
    pub fn compile(&self, raw: RawPolicySet) -> Result<CompiledPolicy, PolicyError> {
        let meta = raw.policy.policy;

        // Unspecified autonomy collapses to the most restrictive level.
        let autonomy = meta
            .autonomy
            .and_then(|section| section.level)
            .unwrap_or(AutonomyLevel::ManualOnly);

        Self::validate_category_references(&raw.categories, &raw.decisions)?;
        Self::validate_action_references(&raw.decisions, &raw.actions)?;
        let actions = self.bind_actions(raw.actions)?;

        let policy = CompiledPolicy {
            domain: meta.domain,
            version: meta.version,
            autonomy,
            categories: raw.categories.categories,
            decisions: raw.decisions.decisions,
            actions,
            risk_levels: raw.risk_rules.risk_levels,
            urgency_levels: raw.risk_rules.urgency_levels,
            risk_urgency_matrix: raw.risk_rules.risk_urgency_matrix,
            risk_constraints: raw.risk_rules.risk_constraints,
            global_rules: meta.global_rules,
            default_fallback_decision: meta.default_fallback_decision,
        };

        info!(
            domain = %policy.domain,
            version = %policy.version,
            autonomy = policy.autonomy.label(),
            "Compiled policy"
        );
        Ok(policy)
    }

    /// Category → decision referential integrity.
    fn validate_category_references(
        categories: &CategoriesDoc,
        decisions: &DecisionsDoc,
    ) -> Result<(), PolicyError> {
        for (category, cfg) in &categories.categories {
            for decision in &cfg.allowed_decisions {
                if !decisions.decisions.contains_key(decision) {
                    return Err(PolicyError::UnknownDecisionReference {
                        category: category.clone(),
                        decision: decision.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Decision → action referential integrity.
    fn validate_action_references(
        decisions: &DecisionsDoc,
        actions: &ActionsDoc,
    ) -> Result<(), PolicyError> {
        for (decision, cfg) in &decisions.decisions {
            for action in &cfg.allowed_actions {
                if !actions.actions.contains_key(action) {
                    return Err(PolicyError::UnknownActionReference {
                        decision: decision.clone(),
                        action: action.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Attach invocation bindings; an unbound external action is fatal.
    fn bind_actions(
        &self,
        actions: ActionsDoc,
    ) -> Result<BTreeMap<String, ActionPolicy>, PolicyError> {
        let mut compiled = BTreeMap::new();
        for (name, raw) in actions.actions {
            let invocation = if raw.external {
                match self.bindings.get(&name) {
                    Some(binding) => Some(binding.clone()),
                    None => return Err(PolicyError::MissingInvocationBinding { action: name }),
                }
            } else {
                None
            };
            compiled.insert(
                name,
                ActionPolicy {
                    description: raw.description,
                    external: raw.external,
                    invocation,
                },
            );
        }
        Ok(compiled)
    }
}
