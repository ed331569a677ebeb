use std::collections::HashMap;
use std::sync::Arc;

use crate::models::error::MemoError;
use crate::models::folder::{FolderScope, FolderStats};
use crate::models::recording_record::RecordingRecord;
use crate::traits::recording_store::RecordingStore;

/// Read-only folder statistics over a recording store.
///
/// Four-way contract, by folder id:
/// - `all_recordings`: not soft-deleted, folder is not `recently_deleted`
/// - `favourites`: as above, and flagged favourite
/// - `recently_deleted`: every soft-deleted record, whatever its folder
/// - anything else: records in that folder that are not soft-deleted
pub struct StatsAggregator {
    store: Arc<dyn RecordingStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn RecordingStore>) -> Self {
        Self { store }
    }

    pub fn folder_stats(&self, folder_id: &str) -> Result<FolderStats, MemoError> {
        let scope = FolderScope::from_id(folder_id);
        let records = match &scope {
            FolderScope::Folder(id) => self.store.query(Some(id.as_str()), false)?,
            _ => self.store.query(None, true)?,
        };
        Ok(aggregate(&scope, &records))
    }

    /// Stats for several folders from a single store read.
    pub fn stats_for(&self, folder_ids: &[&str]) -> Result<HashMap<String, FolderStats>, MemoError> {
        let records = self.store.query(None, true)?;
        Ok(folder_ids
            .iter()
            .map(|id| (id.to_string(), aggregate(&FolderScope::from_id(id), &records)))
            .collect())
    }
}

/// Sum the records selected by `scope`.
pub fn aggregate(scope: &FolderScope, records: &[RecordingRecord]) -> FolderStats {
    let (count, total_ms, total_bytes) = records
        .iter()
        .filter(|r| scope.matches(r))
        .fold((0usize, 0u64, 0u64), |(count, ms, bytes), r| {
            (
                count + 1,
                ms.saturating_add(r.duration_ms),
                bytes.saturating_add(r.file_size_bytes),
            )
        });

    FolderStats {
        count,
        total_duration_seconds: total_ms / 1000,
        total_size_bytes: total_bytes,
    }
}
