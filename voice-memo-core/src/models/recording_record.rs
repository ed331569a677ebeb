use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audio_models::AudioFormat;

/// A finished recording as held by the persistent store.
///
/// Produced by `SessionManager::stop_recording` (not yet persisted) and read
/// back by the stats aggregator and naming resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRecord {
    pub id: String,
    pub name: String,
    pub file_path: PathBuf,
    pub folder_id: String,
    pub format: AudioFormat,
    pub duration_ms: u64,
    pub file_size_bytes: u64,
    pub sample_rate: u32,
    pub is_favorite: bool,
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordingRecord {
    /// Whether a soft-deleted record has outlived `retention` at `now`.
    pub fn is_expired(&self, retention: chrono::Duration, now: DateTime<Utc>) -> bool {
        match (self.is_deleted, self.deleted_at) {
            (true, Some(deleted_at)) => now - deleted_at >= retention,
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: &str, folder_id: &str) -> RecordingRecord {
    let now = Utc::now();
    RecordingRecord {
        id: id.to_string(),
        name: format!("Memo {}", id),
        file_path: PathBuf::from(format!("/memos/{}.m4a", id)),
        folder_id: folder_id.to_string(),
        format: AudioFormat::M4a,
        duration_ms: 1_000,
        file_size_bytes: 100,
        sample_rate: 44100,
        is_favorite: false,
        is_deleted: false,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}
