use std::path::PathBuf;
use std::time::Duration;

use crate::models::audio_models::{PreparedSource, SessionId};

/// The active playback, owned by the session manager.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub file_path: PathBuf,
    pub source: PreparedSource,
    pub position: Duration,
    pub duration: Duration,
    pub speed: f32,
    pub volume: f32,
    /// Latched on the first completion signal; later ones are dropped.
    pub has_completed_current_playback: bool,
}

impl PlaybackSession {
    pub fn new(id: SessionId, file_path: PathBuf, source: PreparedSource) -> Self {
        Self {
            id,
            file_path,
            source,
            position: Duration::ZERO,
            duration: source.duration,
            speed: 1.0,
            volume: 1.0,
            has_completed_current_playback: false,
        }
    }

    /// A device position past a known duration is end-of-file jitter.
    pub fn is_overrun(&self, position: Duration) -> bool {
        !self.duration.is_zero() && position > self.duration
    }

    /// Latch completion and pin the position to the end. Returns false if already latched.
    pub fn complete(&mut self) -> bool {
        if self.has_completed_current_playback {
            return false;
        }
        self.has_completed_current_playback = true;
        self.position = self.duration;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::SourceHandle;

    fn session(duration_secs: u64) -> PlaybackSession {
        PlaybackSession::new(
            SessionId::new(),
            PathBuf::from("/memos/a.m4a"),
            PreparedSource {
                handle: SourceHandle(1),
                duration: Duration::from_secs(duration_secs),
            },
        )
    }

    #[test]
    fn overrun_only_past_known_duration() {
        let s = session(10);
        assert!(!s.is_overrun(Duration::from_secs(10)));
        assert!(s.is_overrun(Duration::from_millis(10_040)));
        assert!(!session(0).is_overrun(Duration::from_secs(99)));
    }

    #[test]
    fn completion_latches_once() {
        let mut s = session(10);
        s.position = Duration::from_secs(3);
        assert!(s.complete());
        assert_eq!(s.position, Duration::from_secs(10));
        assert!(!s.complete());
    }
}
