use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::error::MemoError;
use crate::models::recording_record::RecordingRecord;
use crate::traits::recording_store::RecordingStore;

/// Ordered record table with the store semantics shared by every backend.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordTable {
    pub(crate) records: Vec<RecordingRecord>,
}

impl RecordTable {
    pub(crate) fn new(records: Vec<RecordingRecord>) -> Self {
        Self { records }
    }

    fn position(&self, id: &str) -> Result<usize, MemoError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| MemoError::StorageError(format!("no recording with id {}", id)))
    }

    pub(crate) fn create(&mut self, record: &RecordingRecord) -> Result<(), MemoError> {
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(MemoError::StorageError(format!(
                "recording {} already exists",
                record.id
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    pub(crate) fn update(&mut self, record: &RecordingRecord) -> Result<(), MemoError> {
        let index = self.position(&record.id)?;
        self.records[index] = record.clone();
        Ok(())
    }

    pub(crate) fn get(&self, id: &str) -> Option<RecordingRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    pub(crate) fn query(&self, folder_id: Option<&str>, include_deleted: bool) -> Vec<RecordingRecord> {
        self.records
            .iter()
            .filter(|r| folder_id.map_or(true, |f| r.folder_id == f))
            .filter(|r| include_deleted || !r.is_deleted)
            .cloned()
            .collect()
    }

    pub(crate) fn soft_delete(&mut self, id: &str, deleted_at: DateTime<Utc>) -> Result<(), MemoError> {
        let index = self.position(id)?;
        let record = &mut self.records[index];
        record.is_deleted = true;
        record.deleted_at = Some(deleted_at);
        record.updated_at = deleted_at;
        Ok(())
    }

    pub(crate) fn restore(&mut self, id: &str) -> Result<(), MemoError> {
        let index = self.position(id)?;
        let record = &mut self.records[index];
        if !record.is_deleted {
            return Err(MemoError::InvalidState(format!("recording {} is not deleted", id)));
        }
        record.is_deleted = false;
        record.deleted_at = None;
        Ok(())
    }

    pub(crate) fn delete_permanently(&mut self, id: &str) -> Result<RecordingRecord, MemoError> {
        let index = self.position(id)?;
        Ok(self.records.remove(index))
    }

    pub(crate) fn purge_expired(
        &mut self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecordingRecord>, MemoError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| MemoError::InvalidParameter(format!("retention window out of range: {}", e)))?;

        let (expired, kept): (Vec<_>, Vec<_>) = self
            .records
            .drain(..)
            .partition(|r| r.is_expired(retention, now));
        self.records = kept;
        Ok(expired)
    }
}

/// Recording store held entirely in memory. Suitable for tests and for
/// hosts that persist through their own layer.
#[derive(Debug, Default)]
pub struct InMemoryRecordingStore {
    table: Mutex<RecordTable>,
}

impl InMemoryRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<RecordingRecord>) -> Self {
        Self {
            table: Mutex::new(RecordTable::new(records)),
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordingStore for InMemoryRecordingStore {
    fn create(&self, record: &RecordingRecord) -> Result<(), MemoError> {
        self.table.lock().create(record)
    }

    fn update(&self, record: &RecordingRecord) -> Result<(), MemoError> {
        self.table.lock().update(record)
    }

    fn get(&self, id: &str) -> Result<Option<RecordingRecord>, MemoError> {
        Ok(self.table.lock().get(id))
    }

    fn query(&self, folder_id: Option<&str>, include_deleted: bool) -> Result<Vec<RecordingRecord>, MemoError> {
        Ok(self.table.lock().query(folder_id, include_deleted))
    }

    fn soft_delete(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<(), MemoError> {
        self.table.lock().soft_delete(id, deleted_at)
    }

    fn restore(&self, id: &str) -> Result<(), MemoError> {
        self.table.lock().restore(id)
    }

    fn delete_permanently(&self, id: &str) -> Result<(), MemoError> {
        self.table.lock().delete_permanently(id).map(|_| ())
    }

    fn purge_expired(&self, retention: Duration, now: DateTime<Utc>) -> Result<Vec<RecordingRecord>, MemoError> {
        self.table.lock().purge_expired(retention, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording_record::sample_record;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn create_rejects_duplicate_id() {
        let store = InMemoryRecordingStore::new();
        store.create(&sample_record("a", "work")).unwrap();
        assert!(matches!(
            store.create(&sample_record("a", "home")),
            Err(MemoError::StorageError(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn query_filters_folder_and_deleted() {
        let store = InMemoryRecordingStore::with_records(vec![
            sample_record("a", "work"),
            sample_record("b", "work"),
            sample_record("c", "home"),
        ]);
        store.soft_delete("b", Utc::now()).unwrap();

        let ids = |v: Vec<RecordingRecord>| v.into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(store.query(Some("work"), false).unwrap()), vec!["a"]);
        assert_eq!(ids(store.query(Some("work"), true).unwrap()), vec!["a", "b"]);
        assert_eq!(ids(store.query(None, false).unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn soft_delete_stamps_time_and_restore_clears_it() {
        let store = InMemoryRecordingStore::with_records(vec![sample_record("a", "work")]);
        let at = Utc::now();
        store.soft_delete("a", at).unwrap();

        let deleted = store.get("a").unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.deleted_at, Some(at));

        store.restore("a").unwrap();
        let restored = store.get("a").unwrap().unwrap();
        assert!(!restored.is_deleted);
        assert_eq!(restored.deleted_at, None);
        assert!(store.restore("a").is_err());
    }

    #[test]
    fn purge_removes_only_expired_soft_deletes() {
        let now = Utc::now();
        let store = InMemoryRecordingStore::with_records(vec![
            sample_record("old", "work"),
            sample_record("recent", "work"),
            sample_record("live", "work"),
        ]);
        store.soft_delete("old", now - chrono::Duration::days(16)).unwrap();
        store.soft_delete("recent", now - chrono::Duration::days(2)).unwrap();

        let purged = store.purge_expired(DAY * 15, now).unwrap();

        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id, "old");
        assert!(store.get("old").unwrap().is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_and_delete_unknown_id_fail() {
        let store = InMemoryRecordingStore::new();
        assert!(store.update(&sample_record("ghost", "work")).is_err());
        assert!(store.delete_permanently("ghost").is_err());
        assert!(store.soft_delete("ghost", Utc::now()).is_err());
    }
}
