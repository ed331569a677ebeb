use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::models::error::MemoError;

/// File operations the core needs on recording files.
pub trait AudioFiles: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn size(&self, path: &Path) -> Result<u64, MemoError>;

    /// Remove a file. Removing a missing file succeeds.
    fn delete(&self, path: &Path) -> Result<(), MemoError>;
}

/// `AudioFiles` over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFiles;

impl AudioFiles for LocalFiles {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn size(&self, path: &Path) -> Result<u64, MemoError> {
        fs::metadata(path).map(|m| m.len()).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MemoError::FileNotFound(path.to_path_buf()),
            _ => MemoError::StorageError(format!("failed to stat {}: {}", path.display(), e)),
        })
    }

    fn delete(&self, path: &Path) -> Result<(), MemoError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemoError::StorageError(format!(
                "failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
