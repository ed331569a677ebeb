use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::audio_models::{CaptureParams, SessionId};

/// The active capture, owned by the session manager.
///
/// Invariants: `accumulated_pause` only grows, and `current_pause_started_at`
/// is set exactly while the session is paused.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession {
    pub id: SessionId,
    pub file_path: PathBuf,
    pub folder_id: String,
    pub params: CaptureParams,
    pub started_at: DateTime<Utc>,
    pub accumulated_pause: Duration,
    pub current_pause_started_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    pub fn new(id: SessionId, file_path: PathBuf, folder_id: &str, params: CaptureParams, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            file_path,
            folder_id: folder_id.to_string(),
            params,
            started_at,
            accumulated_pause: Duration::ZERO,
            current_pause_started_at: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.current_pause_started_at.is_some()
    }

    /// Recorded time: wall time since start minus every paused interval,
    /// including the one still open.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let open_pause = self
            .current_pause_started_at
            .map_or(Duration::ZERO, |paused_at| span(paused_at, now));
        span(self.started_at, now)
            .saturating_sub(self.accumulated_pause)
            .saturating_sub(open_pause)
    }

    pub fn begin_pause(&mut self, now: DateTime<Utc>) {
        if self.current_pause_started_at.is_none() {
            self.current_pause_started_at = Some(now);
        }
    }

    /// Close the open pause interval, folding it into `accumulated_pause`.
    pub fn end_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.current_pause_started_at.take() {
            self.accumulated_pause += span(paused_at, now);
        }
    }
}

/// Non-negative wall time between two instants.
fn span(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}
