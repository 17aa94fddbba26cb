pub mod repositories;
pub mod store;

pub use repositories::{
    FileProposalRepository, InMemoryProposalRepository, ProposalRepository, RecordLease,
    RepositoryError,
};
pub use store::{CreateOptions, ProposalStore, RequestContext, ShareLink, StoreSettings};
