//! Per-record exclusion for read-validate-write sequences.
//!
//! Every backend hands out an in-process async mutex per id. The directory
//! backend additionally holds `records/{id}.lock`, created with `create_new`,
//! so writers in other processes wait as well.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedMutexGuard;

use proposey_core::domain::proposal::ProposalId;

use super::RepositoryError;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);
const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
/// A lock file this old belongs to a writer that died mid-sequence.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);

type LockTable = HashMap<ProposalId, Arc<tokio::sync::Mutex<()>>>;

/// Exclusive claim on one record. Released when dropped.
#[must_use = "the claim ends as soon as the lease is dropped"]
pub struct RecordLease {
    // Field order is drop order: the file goes before the in-process slot.
    _file: Option<LockFile>,
    _local: LocalGuard,
}

impl RecordLease {
    pub(crate) fn local(local: LocalGuard) -> Self {
        Self { _file: None, _local: local }
    }

    pub(crate) fn with_file(local: LocalGuard, file: LockFile) -> Self {
        Self { _file: Some(file), _local: local }
    }
}

/// One async mutex per id. Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
pub(crate) struct RecordLocks {
    table: Arc<Mutex<LockTable>>,
}

impl RecordLocks {
    pub(crate) async fn acquire(&self, id: &ProposalId) -> LocalGuard {
        let lock = Arc::clone(lock_table(&self.table).entry(id.clone()).or_default());
        let guard = lock.lock_owned().await;
        LocalGuard { table: Arc::clone(&self.table), id: id.clone(), guard: Some(guard) }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock_table(&self.table).len()
    }
}

pub(crate) struct LocalGuard {
    table: Arc<Mutex<LockTable>>,
    id: ProposalId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LocalGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = lock_table(&self.table);
        if table.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            table.remove(&self.id);
        }
    }
}

fn lock_table(table: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    match table.lock() {
        Ok(table) => table,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A lock file that exists exactly as long as this value.
pub(crate) struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub(crate) async fn acquire(path: PathBuf, id: &ProposalId) -> Result<Self, RepositoryError> {
        let started = Instant::now();
        loop {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    let lock = Self { path };
                    let owner = format!("{}\n", std::process::id());
                    file.write_all(owner.as_bytes())
                        .await
                        .map_err(RepositoryError::io(&lock.path))?;
                    return Ok(lock);
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(&path).await {
                        tracing::warn!(
                            event_name = "store.stale_lock_removed",
                            proposal_id = %id,
                            path = %path.display(),
                            "removing abandoned record lock"
                        );
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                    if started.elapsed() >= LOCK_TIMEOUT {
                        return Err(RepositoryError::Locked(id.clone()));
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Err(err) => return Err(RepositoryError::io(&path)(err)),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            tracing::warn!(
                event_name = "store.lock_release_failed",
                path = %self.path.display(),
                error = %error,
                "record lock could not be removed"
            );
        }
    }
}

async fn is_stale(path: &std::path::Path) -> bool {
    let Ok(metadata) = fs::metadata(path).await else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= LOCK_STALE_AFTER)
}
