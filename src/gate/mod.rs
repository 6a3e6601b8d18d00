//! Confirmation gate — the state machine between validation and execution.
//!
//! `EVALUATING → {EXECUTE, AWAIT_HUMAN, FALLBACK}`; a suspended instance
//! moves `AWAIT_HUMAN → {EXECUTE, FALLBACK}` only on an explicit human
//! signal. There is no timeout-based auto-approval: absent a signal, the
//! machine stays suspended forever.

pub mod snapshot;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision::validator::{ValidationResult, ValidationStatus};
use crate::policy::model::{AutonomyLevel, CompiledPolicy};

pub use snapshot::ConfirmationSnapshot;

// ── Routing ─────────────────────────────────────────────────────────

/// Where a validated decision goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRoute {
    /// Safe to execute without a human in the loop.
    Execute,
    /// Suspend and wait for an explicit human approval.
    AwaitHuman,
    /// Terminal: the fallback decision stands, nothing executes.
    Fallback,
}

impl GateRoute {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::AwaitHuman => "await_human",
            Self::Fallback => "fallback",
        }
    }
}

// ── Resume contract ─────────────────────────────────────────────────

/// Human verdict carried by a resume signal.
///
/// `Other` absorbs any unrecognized wire value so a garbled payload can be
/// routed to fallback instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    Approved,
    Rejected,
    #[serde(other)]
    Other,
}

/// The sole external input accepted while a workflow is suspended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeSignal {
    /// `None` means "no verdict yet" — the instance re-suspends.
    pub approval: Option<Approval>,
    /// Free-text comment from the human, recorded but never interpreted.
    pub comment: Option<String>,
}

impl ResumeSignal {
    pub fn approved(comment: Option<&str>) -> Self {
        Self {
            approval: Some(Approval::Approved),
            comment: comment.map(String::from),
        }
    }

    pub fn rejected(comment: Option<&str>) -> Self {
        Self {
            approval: Some(Approval::Rejected),
            comment: comment.map(String::from),
        }
    }

    pub fn pending() -> Self {
        Self::default()
    }
}

/// Pure resolution of a resume signal for a suspended instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    Execute,
    Fallback,
    /// No verdict — re-enter `AWAIT_HUMAN` with the same snapshot.
    StillSuspended,
}

// ── Gate ────────────────────────────────────────────────────────────

/// Policy- and decision-driven router between validation and execution.
pub struct ConfirmationGate;

impl ConfirmationGate {
    /// Evaluate the transition out of `EVALUATING`, rules in order:
    /// rejection, policy autonomy ceiling, the decision's own confirmation
    /// flag, then auto-execute. The autonomy ceiling overrides whatever the
    /// decision says about itself.
    pub fn evaluate(policy: &CompiledPolicy, validation: &ValidationResult) -> GateRoute {
        let route = if validation.status == ValidationStatus::Rejected {
            GateRoute::Fallback
        } else if policy.autonomy == AutonomyLevel::ManualOnly {
            GateRoute::AwaitHuman
        } else if validation.final_decision.needs_confirmation {
            GateRoute::AwaitHuman
        } else {
            GateRoute::Execute
        };

        debug!(
            status = validation.status.label(),
            autonomy = policy.autonomy.label(),
            needs_confirmation = validation.final_decision.needs_confirmation,
            route = route.label(),
            "Confirmation gate evaluated"
        );
        route
    }

    /// Resolve a resume signal. Pure: same signal, same outcome.
    ///
    /// Anything other than an explicit approval is treated defensively —
    /// rejection and unrecognized verdicts both fall back; a missing verdict
    /// re-suspends idempotently.
    pub fn resolve_resume(signal: &ResumeSignal) -> ResumeOutcome {
        match signal.approval {
            None => ResumeOutcome::StillSuspended,
            Some(Approval::Approved) => ResumeOutcome::Execute,
            Some(Approval::Rejected) | Some(Approval::Other) => ResumeOutcome::Fallback,
        }
    }
}
