//! Policy layer — documents in, immutable compiled policy out.
//!
//! Five human-authored YAML documents per domain are loaded read-only,
//! cross-validated for referential integrity, bound to invocation
//! descriptors, and frozen into a `CompiledPolicy`. The summarizer then
//! projects the compiled policy into the only view the candidate proposer
//! ever sees.

pub mod bindings;
pub mod compiler;
pub mod loader;
pub mod model;
pub mod summarizer;

pub use bindings::{BindingSet, InvocationBinding};
pub use compiler::PolicyCompiler;
pub use loader::PolicyLoader;
pub use model::{
    ActionPolicy, AutonomyLevel, CategoryPolicy, CompiledPolicy, DecisionPolicy, GlobalRules,
    RawPolicySet,
};
pub use summarizer::{PolicySummarizer, PolicySummary};
