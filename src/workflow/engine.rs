//! Triage engine — the stage orchestrator.
//!
//! Drives one email through propose, validate, gate, and execute, and owns
//! the suspension store for instances parked on human confirmation. Stages
//! are strictly ordered; nothing executes before the gate has routed it.
//!
//! Resume semantics:
//! - a signal without a verdict re-suspends idempotently (same snapshot,
//!   same hash, no side effects)
//! - an approval removes the instance from the store before dispatch, so a
//!   duplicate approval finds nothing to execute (at-most-once)
//! - a rejection (or any unrecognized verdict) completes with the policy
//!   fallback payload and never executes

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decision::candidate::CandidateDecision;
use crate::decision::validator::DecisionValidator;
use crate::error::{Result, WorkflowError};
use crate::executor::ExecutionDispatcher;
use crate::gate::{ConfirmationGate, ConfirmationSnapshot, GateRoute, ResumeOutcome, ResumeSignal};
use crate::policy::model::CompiledPolicy;
use crate::policy::summarizer::{PolicySummarizer, PolicySummary};
use crate::proposer::DecisionProposer;
use crate::workflow::state::{EmailContext, EmailMessage, WorkflowState};

/// Action type whose execution needs a composed reply body.
const COMPOSE_ACTION: &str = "compose_email";

/// A workflow instance parked on human confirmation.
#[derive(Debug, Clone)]
pub struct SuspendedWorkflow {
    pub workflow_id: Uuid,
    pub state: WorkflowState,
    pub snapshot: ConfirmationSnapshot,
    pub suspended_at: DateTime<Utc>,
}

/// How one engine entry point finished.
#[derive(Debug)]
pub enum WorkflowOutcome {
    /// Terminal. The state carries the route taken and any execution record.
    Completed(Box<WorkflowState>),
    /// Parked. Resume with the id; the snapshot is what a human approves.
    Suspended {
        workflow_id: Uuid,
        snapshot: ConfirmationSnapshot,
    },
}

/// Orchestrates triage workflows over one compiled policy.
pub struct TriageEngine {
    policy: Arc<CompiledPolicy>,
    summary: PolicySummary,
    validator: DecisionValidator,
    proposer: Arc<dyn DecisionProposer>,
    dispatcher: ExecutionDispatcher,
    suspended: Mutex<HashMap<Uuid, SuspendedWorkflow>>,
}

impl TriageEngine {
    pub fn new(
        policy: Arc<CompiledPolicy>,
        proposer: Arc<dyn DecisionProposer>,
        dispatcher: ExecutionDispatcher,
    ) -> Self {
        let summary = PolicySummarizer::summarize(&policy);
        Self {
            policy,
            summary,
            validator: DecisionValidator::new(),
            proposer,
            dispatcher,
            suspended: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_validator(mut self, validator: DecisionValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Number of instances currently awaiting a human.
    pub async fn suspended_count(&self) -> usize {
        self.suspended.lock().await.len()
    }

    /// Run one email through the full pipeline.
    pub async fn run(&self, email: EmailMessage) -> Result<WorkflowOutcome> {
        let workflow_id = Uuid::new_v4();
        let context = EmailContext::derive(&email);
        info!(
            workflow_id = %workflow_id,
            from = %email.sender,
            subject = %email.subject,
            "Starting triage workflow"
        );

        let candidate = self
            .proposer
            .propose(&self.summary, &email, &context)
            .await?;
        let validation = self.validator.validate(&candidate, &self.policy)?;

        let mut final_decision = validation.final_decision.clone();
        final_decision.derive_primary_action()?;

        // Compose before the gate, so a suspended instance already carries
        // the draft the human is asked to approve.
        self.compose_reply_if_needed(&email, &context, &mut final_decision)
            .await?;

        let route = ConfirmationGate::evaluate(&self.policy, &validation);
        let mut state = WorkflowState {
            workflow_id,
            domain: self.policy.domain.clone(),
            email,
            context,
            policy_summary: self.summary.clone(),
            candidate,
            validation,
            final_decision,
            execution: None,
            route,
            resolution_note: None,
        };

        match route {
            GateRoute::Execute => {
                self.execute(&mut state).await;
                Ok(WorkflowOutcome::Completed(Box::new(state)))
            }
            GateRoute::Fallback => {
                info!(workflow_id = %workflow_id, "Workflow completed on fallback, nothing executed");
                Ok(WorkflowOutcome::Completed(Box::new(state)))
            }
            GateRoute::AwaitHuman => {
                let snapshot = ConfirmationSnapshot::capture(&self.policy, &state.validation);
                info!(
                    workflow_id = %workflow_id,
                    content_hash = %snapshot.content_hash,
                    "Suspending workflow for human confirmation"
                );
                let suspended = SuspendedWorkflow {
                    workflow_id,
                    state,
                    snapshot: snapshot.clone(),
                    suspended_at: Utc::now(),
                };
                self.suspended.lock().await.insert(workflow_id, suspended);
                Ok(WorkflowOutcome::Suspended {
                    workflow_id,
                    snapshot,
                })
            }
        }
    }

    /// Resume a suspended workflow with a human signal.
    pub async fn resume(&self, workflow_id: Uuid, signal: ResumeSignal) -> Result<WorkflowOutcome> {
        match ConfirmationGate::resolve_resume(&signal) {
            ResumeOutcome::StillSuspended => {
                // No verdict. Re-suspend with the original snapshot so a
                // repeated empty signal observes the identical hash.
                let store = self.suspended.lock().await;
                let suspended = store
                    .get(&workflow_id)
                    .ok_or(WorkflowError::NotSuspended(workflow_id))?;
                debug!(workflow_id = %workflow_id, "Resume without verdict, staying suspended");
                Ok(WorkflowOutcome::Suspended {
                    workflow_id,
                    snapshot: suspended.snapshot.clone(),
                })
            }
            ResumeOutcome::Execute => {
                // Remove before dispatch: a concurrent or repeated approval
                // must not execute twice.
                let mut suspended = self.take_suspended(workflow_id).await?;
                suspended.state.context.human_comment = signal.comment;
                info!(workflow_id = %workflow_id, "Human approved, executing");

                let mut state = suspended.state;
                state.route = GateRoute::Execute;
                {
                    // The draft is normally composed before suspension; this
                    // re-entry is a no-op unless the body is still missing.
                    let WorkflowState {
                        ref email,
                        ref context,
                        ref mut final_decision,
                        ..
                    } = state;
                    self.compose_reply_if_needed(email, context, final_decision)
                        .await?;
                }
                self.execute(&mut state).await;
                Ok(WorkflowOutcome::Completed(Box::new(state)))
            }
            ResumeOutcome::Fallback => {
                let mut suspended = self.take_suspended(workflow_id).await?;
                suspended.state.context.human_comment = signal.comment;
                warn!(workflow_id = %workflow_id, "Human rejected, completing on fallback");

                // The validator's record stays as written; the human verdict
                // is workflow-level state.
                let mut state = suspended.state;
                state.route = GateRoute::Fallback;
                state.final_decision = DecisionValidator::fallback(&self.policy);
                state.resolution_note =
                    Some("Human rejected the pending decision".to_string());
                Ok(WorkflowOutcome::Completed(Box::new(state)))
            }
        }
    }

    async fn take_suspended(&self, workflow_id: Uuid) -> Result<SuspendedWorkflow> {
        self.suspended
            .lock()
            .await
            .remove(&workflow_id)
            .ok_or_else(|| WorkflowError::NotSuspended(workflow_id).into())
    }

    /// Compose the reply body when the surviving decision carries a compose
    /// action and no body exists yet. Runs between validation and the gate;
    /// the body check makes the resume re-entry a no-op.
    async fn compose_reply_if_needed(
        &self,
        email: &EmailMessage,
        context: &EmailContext,
        decision: &mut CandidateDecision,
    ) -> Result<()> {
        let wants_reply = decision.proposed_action_types().contains(&COMPOSE_ACTION);
        if !wants_reply || decision.email_body.is_some() {
            return Ok(());
        }

        let body = self
            .proposer
            .compose_reply(&self.summary, email, context)
            .await?;
        debug!("Reply body composed");
        decision.email_body = Some(body);
        Ok(())
    }

    async fn execute(&self, state: &mut WorkflowState) {
        let document = state.document();
        let outcome = self
            .dispatcher
            .execute(&state.final_decision, &self.policy, &document)
            .await;
        if outcome.is_error() {
            warn!(workflow_id = %state.workflow_id, "Execution recorded an error outcome");
        }
        state.execution = Some(outcome);
    }
}
