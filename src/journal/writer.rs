//! Append-only, write-ahead durable journal.
//!
//! Entries are newline-delimited JSON (teacher convention: storage writers serialize
//! structured records line-by-line, see `data::storage::CsvWriter`'s metadata header).
//! Every [`Journal::append`] blocks the caller until the record is `fsync`'d — no
//! external subscriber may observe a state that has not been journaled.

use crate::config::RetentionPolicy;
use crate::error::{EngineError, EngineResult};
use crate::journal::entry::WorkflowJournalEntry;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[async_trait]
pub trait Journal: Send + Sync {
    /// Durably append one entry. Must not return `Ok` until the record is on stable
    /// storage.
    async fn append(&mut self, entry: &WorkflowJournalEntry) -> EngineResult<()>;

    /// Read every entry currently on disk, in append order, for crash recovery and
    /// for tests asserting on journal ordering.
    async fn read_all(&self) -> EngineResult<Vec<WorkflowJournalEntry>>;
}

/// The production journal: a single append-only file, synced on every write.
pub struct FileJournal {
    path: PathBuf,
    retention: RetentionPolicy,
    file: Option<File>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>, retention: RetentionPolicy) -> Self {
        Self {
            path: path.into(),
            retention,
            file: None,
        }
    }

    async fn ensure_open(&mut self) -> EngineResult<&mut File> {
        if self.file.is_none() {
            self.maybe_rotate().await?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            self.file = Some(file);
        }
        Ok(self.file.as_mut().expect("just opened"))
    }

    async fn maybe_rotate(&mut self) -> EngineResult<()> {
        let Ok(metadata) = tokio::fs::metadata(&self.path).await else {
            return Ok(());
        };
        let should_rotate = match self.retention {
            RetentionPolicy::Keep => false,
            RetentionPolicy::RotateAfterBytes { max_bytes } => metadata.len() >= max_bytes,
            RetentionPolicy::RotateAfterDays { max_days } => metadata
                .modified()
                .ok()
                .and_then(|m| m.elapsed().ok())
                .map(|age| age.as_secs() >= u64::from(max_days) * 86_400)
                .unwrap_or(false),
        };
        if should_rotate {
            let sealed = self
                .path
                .with_extension(format!("{}.ndjson", Utc::now().format("%Y%m%dT%H%M%S")));
            tokio::fs::rename(&self.path, &sealed).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Journal for FileJournal {
    async fn append(&mut self, entry: &WorkflowJournalEntry) -> EngineResult<()> {
        let line = serde_json::to_string(entry)?;
        let file = self.ensure_open().await?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| EngineError::JournalError(e.to_string()))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| EngineError::JournalError(e.to_string()))?;
        file.sync_data()
            .await
            .map_err(|e| EngineError::JournalError(e.to_string()))?;
        Ok(())
    }

    async fn read_all(&self) -> EngineResult<Vec<WorkflowJournalEntry>> {
        read_journal_file(&self.path).await
    }
}

pub(crate) async fn read_journal_file(path: &Path) -> EngineResult<Vec<WorkflowJournalEntry>> {
    let mut contents = String::new();
    match File::open(path).await {
        Ok(mut f) => {
            f.read_to_string(&mut contents).await?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EngineError::Io(e)),
    }

    let mut entries = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WorkflowJournalEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                // A torn final line (crash mid-write) is the coherent-tail boundary;
                // stop there rather than failing recovery outright.
                if i == contents.lines().count() - 1 {
                    break;
                }
                return Err(EngineError::JournalError(format!(
                    "corrupt journal entry at line {i}: {e}"
                )));
            }
        }
    }
    Ok(entries)
}

/// In-memory journal used by tests and the demonstration binary; still
/// append-only and still serializes each entry, just without touching disk.
#[derive(Default)]
pub struct InMemoryJournal {
    entries: Vec<WorkflowJournalEntry>,
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn append(&mut self, entry: &WorkflowJournalEntry) -> EngineResult<()> {
        // Round-trip through JSON even in-memory so tests exercise the same
        // serialization path production entries take.
        let line = serde_json::to_string(entry)?;
        let restored: WorkflowJournalEntry = serde_json::from_str(&line)?;
        self.entries.push(restored);
        Ok(())
    }

    async fn read_all(&self) -> EngineResult<Vec<WorkflowJournalEntry>> {
        Ok(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::entry::JournalCategory;
    use crate::model::state::{Trigger, WorkflowState};
    use std::collections::HashMap;

    fn sample_entry() -> WorkflowJournalEntry {
        WorkflowJournalEntry::new(
            WorkflowState::Idle,
            WorkflowState::WorklistSync,
            Trigger::WorklistSyncRequested,
            vec![],
            None,
            None,
            JournalCategory::Workflow,
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn file_journal_round_trips_entries_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("journal.ndjson");
        let mut journal = FileJournal::new(&path, RetentionPolicy::Keep);

        let e1 = sample_entry();
        let e2 = sample_entry();
        journal.append(&e1).await.expect("append 1");
        journal.append(&e2).await.expect("append 2");

        let all = journal.read_all().await.expect("read");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].transition_id, e1.transition_id);
        assert_eq!(all[1].transition_id, e2.transition_id);
    }

    #[tokio::test]
    async fn missing_journal_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.ndjson");
        let journal = FileJournal::new(&path, RetentionPolicy::Keep);
        assert!(journal.read_all().await.expect("read").is_empty());
    }

    #[tokio::test]
    async fn in_memory_journal_preserves_order() {
        let mut journal = InMemoryJournal::default();
        let e1 = sample_entry();
        let e2 = sample_entry();
        journal.append(&e1).await.unwrap();
        journal.append(&e2).await.unwrap();
        let all = journal.read_all().await.unwrap();
        assert_eq!(all[0].transition_id, e1.transition_id);
        assert_eq!(all[1].transition_id, e2.transition_id);
    }
}
