use chrono::{DateTime, Utc};

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::acceptance::{AcceptanceEvidence, AcceptanceRequest, AcceptanceState};
use crate::errors::DomainError;
use crate::workflow::states::{
    AcceptanceAction, AcceptanceEvent, TransitionOutcome, WorkflowContext,
};

/// Lifecycle of a proposal from creation to client acceptance.
///
/// The workflow is pure: it validates a transition and names the side effects
/// the caller must perform. Persisting the result is the store's job.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptanceWorkflow;

impl AcceptanceWorkflow {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self, shared: bool) -> AcceptanceState {
        if shared {
            AcceptanceState::Shared
        } else {
            AcceptanceState::Draft
        }
    }

    pub fn apply(
        &self,
        current: AcceptanceState,
        event: AcceptanceEvent,
        context: &WorkflowContext,
    ) -> Result<TransitionOutcome, DomainError> {
        use AcceptanceAction::{IssueShareLink, RerenderDocument, StampEvidence};
        use AcceptanceEvent::{AcceptanceSubmitted, LinkGenerated};
        use AcceptanceState::{Accepted, Draft, Shared};

        let (to, actions) = match (current, event) {
            (Draft, LinkGenerated) | (Shared, LinkGenerated) => (Shared, vec![IssueShareLink]),
            (Shared, AcceptanceSubmitted) => (Accepted, vec![StampEvidence, RerenderDocument]),
            (Accepted, AcceptanceSubmitted) => {
                return Err(DomainError::AlreadyAccepted {
                    proposal_id: context.proposal_id.clone(),
                });
            }
            (Draft, AcceptanceSubmitted) | (Accepted, LinkGenerated) => {
                return Err(DomainError::InvalidState { state: current, event });
            }
        };

        Ok(TransitionOutcome { from: current, to, event, actions })
    }

    pub fn apply_with_audit<S>(
        &self,
        current: AcceptanceState,
        event: AcceptanceEvent,
        context: &WorkflowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, DomainError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    audit
                        .event(
                            "workflow.transition_applied",
                            AuditCategory::Workflow,
                            AuditOutcome::Success,
                        )
                        .with_metadata("from", format!("{:?}", outcome.from))
                        .with_metadata("to", format!("{:?}", outcome.to))
                        .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event(
                            "workflow.transition_rejected",
                            AuditCategory::Workflow,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("from", format!("{current:?}"))
                        .with_metadata("event", format!("{event:?}"))
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    /// Validates an acceptance request against the current state and stamps the
    /// evidence with `now`. Any date the client sent is kept only for display.
    pub fn accept<S>(
        &self,
        current: AcceptanceState,
        request: AcceptanceRequest,
        now: DateTime<Utc>,
        context: &WorkflowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<(TransitionOutcome, AcceptanceEvidence), DomainError>
    where
        S: AuditSink + ?Sized,
    {
        request.validate()?;
        let outcome =
            self.apply_with_audit(current, AcceptanceEvent::AcceptanceSubmitted, context, sink, audit)?;
        Ok((outcome, AcceptanceEvidence::stamp(request, now)))
    }
}
