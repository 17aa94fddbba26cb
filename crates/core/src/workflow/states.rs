use serde::{Deserialize, Serialize};

use crate::domain::acceptance::AcceptanceState;
use crate::domain::proposal::ProposalId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceEvent {
    LinkGenerated,
    AcceptanceSubmitted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceAction {
    IssueShareLink,
    StampEvidence,
    RerenderDocument,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub proposal_id: ProposalId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: AcceptanceState,
    pub to: AcceptanceState,
    pub event: AcceptanceEvent,
    pub actions: Vec<AcceptanceAction>,
}

impl TransitionOutcome {
    pub fn requires(&self, action: AcceptanceAction) -> bool {
        self.actions.contains(&action)
    }
}
