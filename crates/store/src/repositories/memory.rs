use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tokio::sync::RwLock;

use proposey_core::domain::proposal::{ProposalId, ProposalRecord, ProposalSummary};

use super::locks::{RecordLease, RecordLocks};
use super::{ProposalRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryProposalRepository {
    records: RwLock<BTreeMap<ProposalId, ProposalRecord>>,
    locks: RecordLocks,
}

#[async_trait::async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<ProposalRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn lock_record(&self, id: &ProposalId) -> Result<RecordLease, RepositoryError> {
        Ok(RecordLease::local(self.locks.acquire(id).await))
    }

    async fn insert(&self, record: ProposalRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        match records.entry(record.id.clone()) {
            Entry::Occupied(entry) => Err(RepositoryError::Conflict(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    async fn save(&self, record: ProposalRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProposalSummary>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.values().map(ProposalRecord::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use proposey_core::domain::acceptance::AcceptanceState;

    use crate::repositories::test_support::record;
    use crate::repositories::{InMemoryProposalRepository, ProposalRepository, RepositoryError};

    #[tokio::test]
    async fn insert_rejects_taken_ids() {
        let repo = InMemoryProposalRepository::default();
        repo.insert(record("aaaaaaaaaaaa", 1)).await.expect("first insert");

        let error = repo.insert(record("aaaaaaaaaaaa", 2)).await.expect_err("duplicate id");
        assert!(matches!(error, RepositoryError::Conflict(ref id) if id.as_str() == "aaaaaaaaaaaa"));

        let stored = repo
            .find_by_id(&record("aaaaaaaaaaaa", 1).id)
            .await
            .expect("lookup")
            .expect("record");
        assert_eq!(stored.created_at.format("%d").to_string(), "01");
    }

    #[tokio::test]
    async fn save_overwrites_in_place() {
        let repo = InMemoryProposalRepository::default();
        let mut stored = record("bbbbbbbbbbbb", 3);
        repo.insert(stored.clone()).await.expect("insert");

        stored.state = AcceptanceState::Shared;
        repo.save(stored.clone()).await.expect("save");

        let loaded = repo.find_by_id(&stored.id).await.expect("lookup").expect("record");
        assert_eq!(loaded.state, AcceptanceState::Shared);
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_absent() {
        let repo = InMemoryProposalRepository::default();
        let missing = record("cccccccccccc", 4).id;
        assert!(repo.find_by_id(&missing).await.expect("lookup").is_none());
    }
}
