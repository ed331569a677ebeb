use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::error::MemoError;
use crate::models::recording_record::RecordingRecord;

/// Persistent store of finished recordings.
///
/// Implemented by `InMemoryRecordingStore` and `JsonRecordingStore`; a host
/// app can back it with its own database.
pub trait RecordingStore: Send + Sync {
    fn create(&self, record: &RecordingRecord) -> Result<(), MemoError>;

    fn update(&self, record: &RecordingRecord) -> Result<(), MemoError>;

    fn get(&self, id: &str) -> Result<Option<RecordingRecord>, MemoError>;

    /// Records stored under `folder_id` (every folder when `None`).
    /// Soft-deleted records are only returned when `include_deleted` is set.
    fn query(&self, folder_id: Option<&str>, include_deleted: bool) -> Result<Vec<RecordingRecord>, MemoError>;

    /// Mark a record deleted and stamp `deleted_at`.
    fn soft_delete(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<(), MemoError>;

    /// Undo a soft delete.
    fn restore(&self, id: &str) -> Result<(), MemoError>;

    fn delete_permanently(&self, id: &str) -> Result<(), MemoError>;

    /// Remove soft-deleted records older than `retention` and return them.
    fn purge_expired(&self, retention: Duration, now: DateTime<Utc>) -> Result<Vec<RecordingRecord>, MemoError>;
}
