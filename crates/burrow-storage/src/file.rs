use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    DeleteRequest, LinkId, LinkRecord, LinkStore, ShortCode, Stats, StorageError, StoredLink,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// One line of the storage log.
#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    uuid: String,
    short_url: String,
    orig_url: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    is_deleted: bool,
}

impl From<&LinkRecord> for FileEntry {
    fn from(record: &LinkRecord) -> Self {
        Self {
            uuid: record.id.as_str().to_owned(),
            short_url: record.short_code.as_str().to_owned(),
            orig_url: record.original_url.clone(),
            user_id: record.owner_id.clone(),
            is_deleted: record.is_deleted,
        }
    }
}

impl From<FileEntry> for LinkRecord {
    fn from(entry: FileEntry) -> Self {
        LinkRecord {
            id: LinkId::new(entry.uuid),
            short_code: ShortCode::new_unchecked(entry.short_url),
            original_url: entry.orig_url,
            owner_id: entry.user_id,
            is_deleted: entry.is_deleted,
        }
    }
}

fn encode<'a>(records: impl IntoIterator<Item = &'a LinkRecord>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, &FileEntry::from(record))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        buf.push(b'\n');
    }
    Ok(buf)
}

#[derive(Debug)]
struct FileState {
    path: PathBuf,
    file: File,
    /// Length of the log up to its last complete line.
    len: u64,
    index: HashMap<String, LinkRecord>,
}

impl FileState {
    /// Appends one line per record.
    ///
    /// Bytes past `len` are the remains of a failed write and are cut off
    /// before anything new is written.
    fn append(&mut self, records: &[LinkRecord]) -> Result<()> {
        let buf = encode(records)?;

        if self.file.metadata()?.len() != self.len {
            warn!(path = %self.path.display(), len = self.len, "trimming torn tail of storage log");
            self.file.set_len(self.len)?;
        }
        self.file.seek(SeekFrom::Start(self.len))?;

        if let Err(err) = self.file.write_all(&buf).and_then(|()| self.file.flush()) {
            if let Err(trim) = self.file.set_len(self.len) {
                warn!(error = %trim, "failed to trim storage log after write error");
            }
            return Err(err.into());
        }

        self.len += buf.len() as u64;
        Ok(())
    }

    /// Replaces the log with `records`.
    ///
    /// The new contents are written to a sibling temporary file which is then
    /// renamed over the log, so a failure leaves the previous log in place.
    fn rewrite<'a>(&mut self, records: impl IntoIterator<Item = &'a LinkRecord>) -> Result<()> {
        let buf = encode(records)?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&buf)?;
        tmp.as_file().sync_all()?;
        let file = tmp.persist(&self.path).map_err(|e| e.error)?;

        self.file = file;
        self.len = buf.len() as u64;
        Ok(())
    }
}

/// Append-only JSON lines implementation of [`LinkStore`].
///
/// Every create appends one line per record. The in-memory index rebuilt at
/// [`FileStore::open`] is the read path; the file is only read at startup.
/// [`LinkStore::delete_batch`] rewrites the log and then flips the flags in
/// the index. No deduplication by original URL.
///
/// Disk writes run on the blocking thread pool.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<Mutex<FileState>>,
}

impl FileStore {
    /// Opens (or creates) the log at `path` and replays it into the index.
    ///
    /// The parent directory must already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(StorageError::Unavailable(format!(
                    "storage directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let index = Self::replay(&file)?;
        let len = file.metadata()?.len();
        info!(path = %path.display(), links = index.len(), "file storage loaded");

        Ok(Self {
            path: path.clone(),
            state: Arc::new(Mutex::new(FileState {
                path,
                file,
                len,
                index,
            })),
        })
    }

    /// Returns the path of the storage log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(file: &File) -> Result<HashMap<String, LinkRecord>> {
        let mut index = HashMap::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: FileEntry = serde_json::from_str(&line).map_err(|e| {
                StorageError::InvalidData(format!("line {}: {e}", line_no + 1))
            })?;
            index.insert(entry.short_url.clone(), LinkRecord::from(entry));
        }
        Ok(index)
    }

    async fn with_state<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FileState) -> Result<T> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || f(&mut state.lock()))
            .await
            .map_err(|e| StorageError::Operation(format!("file storage task failed: {e}")))?
    }
}

#[async_trait]
impl LinkStore for FileStore {
    async fn add(&self, record: LinkRecord) -> Result<StoredLink> {
        self.with_state(move |state| {
            state.append(std::slice::from_ref(&record))?;
            state
                .index
                .insert(record.short_code.as_str().to_owned(), record.clone());
            Ok(StoredLink::Inserted(record))
        })
        .await
    }

    async fn add_batch(&self, records: Vec<LinkRecord>) -> Result<Vec<LinkRecord>> {
        self.with_state(move |state| {
            state.append(&records)?;
            for record in &records {
                state
                    .index
                    .insert(record.short_code.as_str().to_owned(), record.clone());
            }
            Ok(records)
        })
        .await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        Ok(self.state.lock().index.get(code.as_str()).cloned())
    }

    async fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        Ok(self
            .state
            .lock()
            .index
            .values()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<()> {
        let requests = requests.to_vec();
        self.with_state(move |state| {
            let doomed: HashSet<String> = requests
                .iter()
                .filter(|request| {
                    state
                        .index
                        .get(request.short_code.as_str())
                        .is_some_and(|r| r.is_owned_by(&request.owner_id) && !r.is_deleted)
                })
                .map(|request| request.short_code.as_str().to_owned())
                .collect();

            if doomed.is_empty() {
                return Ok(());
            }

            // The index only changes once the new log is on disk.
            let updated: Vec<LinkRecord> = state
                .index
                .values()
                .map(|record| {
                    let mut record = record.clone();
                    if doomed.contains(record.short_code.as_str()) {
                        record.is_deleted = true;
                    }
                    record
                })
                .collect();

            debug!(count = doomed.len(), "rewriting storage log after delete");
            state.rewrite(&updated)?;
            for record in updated {
                state
                    .index
                    .insert(record.short_code.as_str().to_owned(), record);
            }
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> Result<Stats> {
        let state = self.state.lock();
        let owners: HashSet<&str> = state
            .index
            .values()
            .map(|record| record.owner_id.as_str())
            .collect();
        Ok(Stats::new(state.index.len(), owners.len()))
    }
}
