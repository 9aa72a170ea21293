use crate::table::RecordTable;
use async_trait::async_trait;
use linkbox_core::registry::Result;
use linkbox_core::{OwnerId, Registry, SaveOutcome, ShortCode, StorageError, UrlRecord};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// File-backed implementation of the [`Registry`] trait.
///
/// Behaves like [`InMemoryRegistry`](crate::InMemoryRegistry) and keeps a
/// JSON snapshot of the whole map on disk: the file is read once on open,
/// and every mutation that changes the map truncates it and writes the full
/// snapshot again. Write cost therefore grows with the total record count.
///
/// Snapshot layout: one JSON object mapping each short code to
/// `{"original_url", "owner", "deleted"}`.
///
/// A failed write leaves the in-memory map ahead of the file; it is not
/// rolled back.
///
/// Every operation locks the state on tokio's blocking pool, so snapshot
/// writes never stall the async workers.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    state: Arc<Mutex<FileState>>,
}

#[derive(Debug)]
struct FileState {
    table: RecordTable,
    /// `None` once the registry has been closed.
    file: Option<File>,
}

impl FileState {
    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(StorageError::Closed)
    }

    fn persist(&mut self) -> Result<()> {
        let snapshot = serde_json::to_vec(self.table.records())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let file = self.file()?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&snapshot)?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

impl FileRegistry {
    /// Opens (or creates) the snapshot file at `path` and loads it.
    ///
    /// An empty file yields an empty registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let records = load_snapshot(&mut file)?;
        info!(path = %path.display(), records = records.len(), "loaded url snapshot");

        Ok(Self {
            path,
            state: Arc::new(Mutex::new(FileState {
                table: RecordTable::from_records(records),
                file: Some(file),
            })),
        })
    }

    /// Runs `op` with the state locked on a blocking thread.
    async fn with_state<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FileState) -> Result<T> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || op(&mut state.lock()))
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_snapshot(file: &mut File) -> Result<BTreeMap<ShortCode, UrlRecord>> {
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content).map_err(|e| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl Registry for FileRegistry {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let code = code.clone();
        self.with_state(move |state| Ok(state.table.get(&code)))
            .await
    }

    async fn save(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner: &OwnerId,
    ) -> Result<SaveOutcome> {
        let (code, original_url, owner) = (code.clone(), original_url.to_string(), owner.clone());

        self.with_state(move |state| {
            state.file()?;

            let outcome = state.table.save(&code, &original_url, &owner)?;
            if outcome.is_new() {
                state.persist()?;
            }
            trace!(code = %outcome.code(), created = outcome.is_new(), "saved url");
            Ok(outcome)
        })
        .await
    }

    async fn batch_save(&self, items: &[(ShortCode, String)], owner: &OwnerId) -> Result<()> {
        let (items, owner) = (items.to_vec(), owner.clone());

        self.with_state(move |state| {
            state.file()?;

            let mut applied = 0;
            let mut failure = None;
            for (code, original_url) in &items {
                match state.table.insert(code, original_url, &owner) {
                    Ok(()) => applied += 1,
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }

            if applied > 0 {
                state.persist()?;
            }
            debug!(count = applied, owner = %owner, "saved url batch");

            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
        .await
    }

    async fn owner_urls(&self, owner: &OwnerId) -> Result<BTreeMap<ShortCode, String>> {
        let owner = owner.clone();
        self.with_state(move |state| Ok(state.table.owner_urls(&owner)))
            .await
    }

    async fn delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<()> {
        let (codes, owner) = (codes.to_vec(), owner.clone());

        self.with_state(move |state| {
            state.file()?;

            let changed = state.table.delete(&codes, &owner);
            if changed > 0 {
                state.persist()?;
            }
            debug!(requested = codes.len(), changed, owner = %owner, "marked urls deleted");
            Ok(())
        })
        .await
    }

    async fn ping(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let path = self.path.clone();
        self.with_state(move |state| {
            if state.file.take().is_some() {
                info!(path = %path.display(), "closed url snapshot");
            }
            Ok(())
        })
        .await
    }
}
