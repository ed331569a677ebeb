use serde::{Deserialize, Serialize};

use super::recording_record::RecordingRecord;

pub const ALL_RECORDINGS_FOLDER_ID: &str = "all_recordings";
pub const FAVOURITES_FOLDER_ID: &str = "favourites";
pub const RECENTLY_DELETED_FOLDER_ID: &str = "recently_deleted";

/// How a folder identifier selects records.
///
/// The three virtual folders have no stored membership; their contents are
/// computed from record flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FolderScope {
    AllRecordings,
    Favourites,
    RecentlyDeleted,
    Folder(String),
}

impl FolderScope {
    pub fn from_id(folder_id: &str) -> Self {
        match folder_id {
            ALL_RECORDINGS_FOLDER_ID => Self::AllRecordings,
            FAVOURITES_FOLDER_ID => Self::Favourites,
            RECENTLY_DELETED_FOLDER_ID => Self::RecentlyDeleted,
            other => Self::Folder(other.to_string()),
        }
    }

    pub fn is_virtual(&self) -> bool {
        !matches!(self, Self::Folder(_))
    }

    pub fn matches(&self, record: &RecordingRecord) -> bool {
        match self {
            Self::AllRecordings => {
                !record.is_deleted && record.folder_id != RECENTLY_DELETED_FOLDER_ID
            }
            Self::Favourites => {
                !record.is_deleted
                    && record.is_favorite
                    && record.folder_id != RECENTLY_DELETED_FOLDER_ID
            }
            Self::RecentlyDeleted => record.is_deleted,
            Self::Folder(id) => !record.is_deleted && record.folder_id == *id,
        }
    }
}

/// Per-folder totals, computed on demand and never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStats {
    pub count: usize,
    pub total_duration_seconds: u64,
    pub total_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording_record::sample_record;

    #[test]
    fn virtual_ids_map_to_virtual_scopes() {
        assert_eq!(FolderScope::from_id("all_recordings"), FolderScope::AllRecordings);
        assert_eq!(FolderScope::from_id("favourites"), FolderScope::Favourites);
        assert_eq!(FolderScope::from_id("recently_deleted"), FolderScope::RecentlyDeleted);
        assert_eq!(FolderScope::from_id("work"), FolderScope::Folder("work".into()));
        assert!(!FolderScope::from_id("work").is_virtual());
    }

    #[test]
    fn recently_deleted_ignores_original_folder() {
        let mut record = sample_record("1", "work");
        record.is_deleted = true;

        assert!(FolderScope::RecentlyDeleted.matches(&record));
        assert!(!FolderScope::Folder("work".into()).matches(&record));
        assert!(!FolderScope::AllRecordings.matches(&record));
    }

    #[test]
    fn trash_folder_records_excluded_from_all_and_favourites() {
        let mut record = sample_record("2", RECENTLY_DELETED_FOLDER_ID);
        record.is_favorite = true;

        assert!(!FolderScope::AllRecordings.matches(&record));
        assert!(!FolderScope::Favourites.matches(&record));
    }
}
