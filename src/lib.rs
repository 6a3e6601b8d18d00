//! Inbox Warden — policy-gated email triage core.
//!
//! **Core invariant: no consequential action without deterministic
//! validation, and no external communication without the confirmation
//! the policy demands.**
//!
//! Flow:
//! 1. Policy documents → compiler → immutable `CompiledPolicy`
//! 2. Summarizer → minimal constraint surface for the candidate proposer
//! 3. Proposer (external, untrusted) → `CandidateDecision`
//! 4. Validator → approved / downgraded / rejected with a final decision
//! 5. Confirmation gate → execute, suspend for a human, or fall back
//! 6. Dispatcher → bound tool invocation, outcome recorded verbatim

pub mod config;
pub mod decision;
pub mod error;
pub mod executor;
pub mod gate;
pub mod policy;
pub mod proposer;
pub mod workflow;
