use std::sync::Arc;
use std::time::Duration;

use crate::models::error::MemoError;
use crate::session::timer::RepeatingTimer;
use crate::traits::audio_files::AudioFiles;
use crate::traits::clock::Clock;
use crate::traits::recording_store::RecordingStore;

/// Purges soft-deleted recordings once they outlive the retention window,
/// removing their audio files as well.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn RecordingStore>,
    files: Arc<dyn AudioFiles>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<dyn RecordingStore>,
        files: Arc<dyn AudioFiles>,
        clock: Arc<dyn Clock>,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            files,
            clock,
            retention,
        }
    }

    /// Run one purge. Returns the number of records removed.
    ///
    /// File deletion failures are logged; the record is already gone and the
    /// orphaned file does not block later sweeps.
    pub fn sweep_once(&self) -> Result<usize, MemoError> {
        let purged = self.store.purge_expired(self.retention, self.clock.now())?;
        for record in &purged {
            if let Err(e) = self.files.delete(&record.file_path) {
                log::warn!("failed to delete purged recording {}: {}", record.file_path.display(), e);
            }
        }
        if !purged.is_empty() {
            log::info!("purged {} expired recordings", purged.len());
        }
        Ok(purged.len())
    }

    /// Sweep every `interval` on a background thread until the timer is dropped.
    pub fn spawn(self, interval: Duration) -> Result<RepeatingTimer, MemoError> {
        RepeatingTimer::start("retention-sweep", interval, move || {
            if let Err(e) = self.sweep_once() {
                log::error!("retention sweep failed: {}", e);
            }
            true
        })
    }
}
