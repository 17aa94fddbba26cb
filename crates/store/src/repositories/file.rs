//! Directory-backed repository.
//!
//! Layout under the data directory:
//!
//! ```text
//! records/{id}.json        snapshot, the commit point for a record
//! records/{id}.lock        present while a writer holds the record
//! documents/{digest}.pdf   rendered documents, content addressed
//! images/{digest}.{ext}    uploaded exhibit images, content addressed
//! ```
//!
//! Blobs are written before the record that references them, every file goes
//! through a temp file and a rename, so a reader sees either the previous
//! record or the new one. A replaced document is removed after the commit; a
//! reader still holding the old snapshot re-reads the record.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use proposey_core::domain::proposal::{
    ProposalId, ProposalRecord, ProposalSnapshot, ProposalSummary, RenderedDocument,
};

use super::locks::{LockFile, RecordLease, RecordLocks};
use super::{ProposalRepository, RepositoryError};

const RECORDS_DIR: &str = "records";
const DOCUMENTS_DIR: &str = "documents";
const IMAGES_DIR: &str = "images";
/// Snapshot reads before giving up on a record whose document keeps moving.
const READ_ATTEMPTS: usize = 3;

pub struct FileProposalRepository {
    root: PathBuf,
    locks: RecordLocks,
}

impl FileProposalRepository {
    /// Opens (and creates when missing) the directory tree under `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        for dir in [RECORDS_DIR, DOCUMENTS_DIR, IMAGES_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).await.map_err(RepositoryError::io(&path))?;
        }
        Ok(Self { root, locks: RecordLocks::default() })
    }

    fn record_path(&self, id: &ProposalId) -> PathBuf {
        self.root.join(RECORDS_DIR).join(format!("{id}.json"))
    }

    fn lock_path(&self, id: &ProposalId) -> PathBuf {
        self.root.join(RECORDS_DIR).join(format!("{id}.lock"))
    }

    fn document_path(&self, digest: &str) -> PathBuf {
        self.root.join(DOCUMENTS_DIR).join(format!("{digest}.pdf"))
    }

    fn image_path(&self, file_name: &str) -> PathBuf {
        self.root.join(IMAGES_DIR).join(file_name)
    }

    async fn read_snapshot(&self, path: &Path) -> Result<Option<ProposalSnapshot>, RepositoryError> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(RepositoryError::io(path)(err)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|err| RepositoryError::Decode(format!("{}: {err}", path.display())))
    }

    /// Loads the blobs behind `snapshot`. `None` when its document has already
    /// been replaced by a newer commit.
    async fn hydrate(
        &self,
        snapshot: ProposalSnapshot,
    ) -> Result<Option<ProposalRecord>, RepositoryError> {
        let document_path = self.document_path(&snapshot.document.digest);
        let Some(bytes) = read_blob(&document_path).await? else {
            return Ok(None);
        };
        let document = RenderedDocument::new(bytes, snapshot.document.page_count);
        if document.digest() != snapshot.document.digest {
            return Err(RepositoryError::Decode(format!(
                "document for proposal `{}` does not match digest {}",
                snapshot.id, snapshot.document.digest
            )));
        }

        let mut config = snapshot.config;
        if let Some(image) = config.image.take() {
            let image_path = self.image_path(&image.file_name());
            let Some(bytes) = read_blob(&image_path).await? else {
                return Ok(None);
            };
            let image = image
                .with_data(bytes)
                .map_err(|err| RepositoryError::Decode(err.to_string()))?;
            config.image = Some(image);
        }

        Ok(Some(ProposalRecord {
            id: snapshot.id,
            config,
            document,
            created_at: snapshot.created_at,
            state: snapshot.state,
            shared_at: snapshot.shared_at,
            evidence: snapshot.evidence,
        }))
    }

    /// Writes the blobs a record points at. Existing blobs are left untouched.
    async fn write_blobs(&self, record: &ProposalRecord) -> Result<(), RepositoryError> {
        if let Some(image) = &record.config.image {
            let path = self.image_path(&image.file_name());
            if !path_exists(&path).await? {
                write_atomic(&path, image.data()).await?;
            }
        }
        let path = self.document_path(record.document.digest());
        if !path_exists(&path).await? {
            write_atomic(&path, record.document.bytes()).await?;
        }
        Ok(())
    }

    fn encode(record: &ProposalRecord) -> Result<Vec<u8>, RepositoryError> {
        serde_json::to_vec_pretty(&record.snapshot())
            .map_err(|err| RepositoryError::Decode(err.to_string()))
    }

    async fn remove_superseded(&self, id: &ProposalId, digest: &str) {
        let path = self.document_path(digest);
        if let Err(error) = fs::remove_file(&path).await {
            tracing::warn!(
                event_name = "store.document_gc_failed",
                proposal_id = %id,
                path = %path.display(),
                error = %error,
                "superseded document could not be removed"
            );
        }
    }
}

#[async_trait::async_trait]
impl ProposalRepository for FileProposalRepository {
    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<ProposalRecord>, RepositoryError> {
        let path = self.record_path(id);
        let mut missing = None;
        for _ in 0..READ_ATTEMPTS {
            let Some(snapshot) = self.read_snapshot(&path).await? else {
                return Ok(None);
            };
            let document_path = self.document_path(&snapshot.document.digest);
            match self.hydrate(snapshot).await? {
                Some(record) => return Ok(Some(record)),
                None => missing = Some(document_path),
            }
        }
        let missing = missing.unwrap_or(path);
        Err(RepositoryError::io(missing)(std::io::Error::from(std::io::ErrorKind::NotFound)))
    }

    async fn lock_record(&self, id: &ProposalId) -> Result<RecordLease, RepositoryError> {
        let local = self.locks.acquire(id).await;
        let file = LockFile::acquire(self.lock_path(id), id).await?;
        Ok(RecordLease::with_file(local, file))
    }

    async fn insert(&self, record: ProposalRecord) -> Result<(), RepositoryError> {
        let path = self.record_path(&record.id);
        if path_exists(&path).await? {
            return Err(RepositoryError::Conflict(record.id));
        }
        self.write_blobs(&record).await?;

        // A hard link fails when the target exists, which makes the commit
        // create-only even against another process.
        let encoded = Self::encode(&record)?;
        let temp = temp_path(&path);
        write_file(&temp, &encoded).await?;
        let linked = fs::hard_link(&temp, &path).await;
        let _ = fs::remove_file(&temp).await;
        match linked {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RepositoryError::Conflict(record.id))
            }
            Err(err) => Err(RepositoryError::io(&path)(err)),
        }
    }

    async fn save(&self, record: ProposalRecord) -> Result<(), RepositoryError> {
        let path = self.record_path(&record.id);
        let previous = self.read_snapshot(&path).await?.map(|snapshot| snapshot.document.digest);

        self.write_blobs(&record).await?;
        write_atomic(&path, &Self::encode(&record)?).await?;

        if let Some(previous) = previous {
            if previous != record.document.digest() {
                self.remove_superseded(&record.id, &previous).await;
            }
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ProposalSummary>, RepositoryError> {
        let dir = self.root.join(RECORDS_DIR);
        let mut entries = fs::read_dir(&dir).await.map_err(RepositoryError::io(&dir))?;
        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(RepositoryError::io(&dir))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(snapshot) = self.read_snapshot(&path).await? {
                summaries.push(snapshot.summary());
            }
        }
        Ok(summaries)
    }
}

async fn read_blob(path: &Path) -> Result<Option<Vec<u8>>, RepositoryError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(RepositoryError::io(path)(err)),
    }
}

async fn path_exists(path: &Path) -> Result<bool, RepositoryError> {
    fs::try_exists(path).await.map_err(RepositoryError::io(path))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("blob");
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), RepositoryError> {
    let mut file = fs::File::create(path).await.map_err(RepositoryError::io(path))?;
    file.write_all(bytes).await.map_err(RepositoryError::io(path))?;
    file.sync_all().await.map_err(RepositoryError::io(path))?;
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RepositoryError> {
    let temp = temp_path(path);
    if let Err(error) = write_file(&temp, bytes).await {
        let _ = fs::remove_file(&temp).await;
        return Err(error);
    }
    if let Err(error) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(RepositoryError::io(path)(error));
    }
    Ok(())
}
