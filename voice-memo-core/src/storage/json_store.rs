use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::error::MemoError;
use crate::models::recording_record::RecordingRecord;
use crate::storage::memory_store::RecordTable;
use crate::traits::recording_store::RecordingStore;

/// Recording store persisted as a single pretty-printed JSON array.
///
/// The whole table is rewritten on every mutation (temp file + rename), which
/// is fine for the few thousand records a memo app holds.
pub struct JsonRecordingStore {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

impl JsonRecordingStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MemoError> {
        let path = path.into();
        let records = if path.exists() {
            read_records(&path)?
        } else {
            Vec::new()
        };
        log::debug!("opened recording store {} ({} records)", path.display(), records.len());
        Ok(Self {
            path,
            table: Mutex::new(RecordTable::new(records)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `op` and persist. On a write failure the in-memory table is rolled back.
    fn mutate<T>(&self, op: impl FnOnce(&mut RecordTable) -> Result<T, MemoError>) -> Result<T, MemoError> {
        let mut table = self.table.lock();
        let before = table.clone();
        let out = op(&mut *table)?;
        if let Err(e) = write_records(&table.records, &self.path) {
            *table = before;
            return Err(e);
        }
        Ok(out)
    }
}

impl RecordingStore for JsonRecordingStore {
    fn create(&self, record: &RecordingRecord) -> Result<(), MemoError> {
        self.mutate(|t| t.create(record))
    }

    fn update(&self, record: &RecordingRecord) -> Result<(), MemoError> {
        self.mutate(|t| t.update(record))
    }

    fn get(&self, id: &str) -> Result<Option<RecordingRecord>, MemoError> {
        Ok(self.table.lock().get(id))
    }

    fn query(&self, folder_id: Option<&str>, include_deleted: bool) -> Result<Vec<RecordingRecord>, MemoError> {
        Ok(self.table.lock().query(folder_id, include_deleted))
    }

    fn soft_delete(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<(), MemoError> {
        self.mutate(|t| t.soft_delete(id, deleted_at))
    }

    fn restore(&self, id: &str) -> Result<(), MemoError> {
        self.mutate(|t| t.restore(id))
    }

    fn delete_permanently(&self, id: &str) -> Result<(), MemoError> {
        self.mutate(|t| t.delete_permanently(id).map(|_| ()))
    }

    fn purge_expired(&self, retention: Duration, now: DateTime<Utc>) -> Result<Vec<RecordingRecord>, MemoError> {
        self.mutate(|t| t.purge_expired(retention, now))
    }
}

fn read_records(path: &Path) -> Result<Vec<RecordingRecord>, MemoError> {
    let json = fs::read_to_string(path)
        .map_err(|e| MemoError::StorageError(format!("failed to read recordings: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| MemoError::StorageError(format!("failed to parse recordings: {}", e)))
}

fn write_records(records: &[RecordingRecord], path: &Path) -> Result<(), MemoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| MemoError::StorageError(format!("failed to create directory: {}", e)))?;
    }
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| MemoError::StorageError(format!("failed to serialize recordings: {}", e)))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .map_err(|e| MemoError::StorageError(format!("failed to write recordings: {}", e)))?;
    fs::rename(&tmp, path)
        .map_err(|e| MemoError::StorageError(format!("failed to replace recordings: {}", e)))?;
    Ok(())
}
