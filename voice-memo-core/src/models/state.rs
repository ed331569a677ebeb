use std::time::Duration;

use super::error::MemoError;
use super::recording_record::RecordingRecord;

/// Recording side of the session state machine.
///
/// State transitions:
/// ```text
/// idle → starting → recording ↔ paused
///                       ↓          ↓
///                    stopping → completed / cancelled / failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingState {
    Idle,
    Starting,
    Recording { elapsed: Duration },
    Paused { elapsed: Duration },
    Stopping,
    Completed(Box<RecordingRecord>),
    Cancelled,
    Failed(MemoError),
}

impl RecordingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled | Self::Failed(_))
    }

    /// Idle and terminal states hold no session; a new one may start.
    pub fn is_inactive(&self) -> bool {
        self.is_idle() || self.is_terminal()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::Recording { elapsed } | Self::Paused { elapsed } => Some(*elapsed),
            Self::Completed(record) => Some(Duration::from_millis(record.duration_ms)),
            _ => None,
        }
    }
}

/// Playback side of the session state machine.
///
/// State transitions:
/// ```text
/// idle → loading → playing ↔ paused
///                     ↓         ↓
///                  stopping → completed / failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing { position: Duration, duration: Duration },
    Paused { position: Duration, duration: Duration },
    Stopping,
    Completed { duration: Duration },
    Failed(MemoError),
}

impl PlaybackState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed(_))
    }

    /// Playing or paused: the device holds an active source.
    pub fn is_active(&self) -> bool {
        self.is_playing() || self.is_paused()
    }

    pub fn position(&self) -> Option<Duration> {
        match self {
            Self::Playing { position, .. } | Self::Paused { position, .. } => Some(*position),
            Self::Completed { duration } => Some(*duration),
            _ => None,
        }
    }

    /// Progress in `0.0..=1.0`, or `None` without a known duration.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Playing { position, duration } | Self::Paused { position, duration } => {
                if duration.is_zero() {
                    return None;
                }
                Some((position.as_secs_f64() / duration.as_secs_f64()).min(1.0))
            }
            Self::Completed { .. } => Some(1.0),
            _ => None,
        }
    }
}
