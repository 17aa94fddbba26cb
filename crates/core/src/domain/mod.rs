pub mod acceptance;
pub mod proposal;

pub use acceptance::{AcceptanceEvidence, AcceptanceMethod, AcceptanceRequest, AcceptanceState};
pub use proposal::{
    ClientInfo, DocumentMetadata, ProjectInfo, ProposalConfig, ProposalDefaults, ProposalId,
    ProposalInput, ProposalRecord, ProposalSnapshot, ProposalSummary, RenderedDocument, ScopeItem,
};
