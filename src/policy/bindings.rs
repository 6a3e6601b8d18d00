//! Action → invocation bindings.
//!
//! The `BindingSet` is the single point of truth for which actions may ever
//! reach an external system, and with which tool and arguments. It is
//! injected into the compiler at construction time — deployments swap it out
//! without touching policy documents, and nothing else in the crate may bind
//! an action to a tool.

use std::collections::BTreeMap;

use serde::Serialize;

/// How an external action is invoked: a `service.method` tool name plus a
/// mapping from tool argument name to a dot-path into workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationBinding {
    /// Tool name in `service.method` form (e.g. `gmail.reply_thread`).
    pub tool: String,
    /// argument name → dot-path resolved against workflow state at dispatch
    /// (e.g. `body` → `final_decision.email_body`).
    pub argument_paths: BTreeMap<String, String>,
}

impl InvocationBinding {
    pub fn new(tool: &str, argument_paths: &[(&str, &str)]) -> Self {
        Self {
            tool: tool.to_string(),
            argument_paths: argument_paths
                .iter()
                .map(|(arg, path)| (arg.to_string(), path.to_string()))
                .collect(),
        }
    }
}

/// The set of invocation bindings available to one deployment.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: BTreeMap<String, InvocationBinding>,
}

impl BindingSet {
    /// An empty set — every external action fails compilation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The bindings shipped with the stock mail/calendar deployment.
    pub fn builtin() -> Self {
        let mut set = Self::default();
        set.insert(
            "compose_email",
            InvocationBinding::new(
                "gmail.reply_thread",
                &[
                    ("thread_id", "email.thread_id"),
                    ("body", "final_decision.email_body"),
                ],
            ),
        );
        set.insert(
            "add_label",
            InvocationBinding::new(
                "gmail.add_label",
                &[
                    ("thread_id", "email.thread_id"),
                    ("label", "final_decision.label"),
                ],
            ),
        );
        set.insert(
            "create_calendar_event",
            InvocationBinding::new(
                "calendar.create_event",
                &[
                    ("title", "final_decision.title"),
                    ("start_time", "final_decision.start_time"),
                    ("duration", "final_decision.duration"),
                ],
            ),
        );
        set
    }

    /// Add or replace a binding.
    pub fn insert(&mut self, action: &str, binding: InvocationBinding) {
        self.bindings.insert(action.to_string(), binding);
    }

    /// Look up the binding for an action.
    pub fn get(&self, action: &str) -> Option<&InvocationBinding> {
        self.bindings.get(action)
    }

    /// Action names with bindings (sorted).
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_stock_actions() {
        let set = BindingSet::builtin();
        assert!(set.get("compose_email").is_some());
        assert!(set.get("add_label").is_some());
        assert!(set.get("create_calendar_event").is_some());
        assert!(set.get("rm_rf").is_none());
    }

    #[test]
    fn compose_email_binding_shape() {
        let set = BindingSet::builtin();
        let binding = set.get("compose_email").unwrap();
        assert_eq!(binding.tool, "gmail.reply_thread");
        assert_eq!(
            binding.argument_paths.get("thread_id").map(String::as_str),
            Some("email.thread_id")
        );
        assert_eq!(
            binding.argument_paths.get("body").map(String::as_str),
            Some("final_decision.email_body")
        );
    }

    #[test]
    fn insert_replaces_existing() {
        let mut set = BindingSet::empty();
        set.insert("x", InvocationBinding::new("a.b", &[]));
        set.insert("x", InvocationBinding::new("c.d", &[]));
        assert_eq!(set.get("x").unwrap().tool, "c.d");
    }
}
