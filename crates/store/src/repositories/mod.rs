use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use proposey_core::domain::proposal::{ProposalId, ProposalRecord, ProposalSummary};
use proposey_core::errors::ApplicationError;

pub mod file;
mod locks;
pub mod memory;

pub use file::FileProposalRepository;
pub use locks::RecordLease;
pub use memory::InMemoryProposalRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("io error at `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("proposal `{0}` already exists")]
    Conflict(ProposalId),
    #[error("proposal `{0}` is held by another writer")]
    Locked(ProposalId),
}

impl RepositoryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Storage(value.to_string())
    }
}

/// Backing medium for proposal records. A record is either fully present
/// (config, document and state together) or absent.
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<ProposalRecord>, RepositoryError>;

    /// Claims `id` for a read-validate-write sequence. Every writer sharing the
    /// backing medium waits until the lease is dropped.
    async fn lock_record(&self, id: &ProposalId) -> Result<RecordLease, RepositoryError>;

    /// Stores a new record; fails with `Conflict` when the id is taken.
    async fn insert(&self, record: ProposalRecord) -> Result<(), RepositoryError>;

    /// Replaces an existing record in place.
    async fn save(&self, record: ProposalRecord) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<ProposalSummary>, RepositoryError>;
}
