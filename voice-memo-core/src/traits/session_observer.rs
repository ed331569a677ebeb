use std::time::Duration;

use crate::models::state::{PlaybackState, RecordingState};

/// Event sink for session state changes and telemetry.
///
/// All methods are called from whichever thread produced the event (caller,
/// device callback, or poll timer), never while the manager holds a lock.
/// Implementations should marshal to the UI thread if needed.
pub trait SessionObserver: Send + Sync {
    fn on_recording_state_changed(&self, _state: &RecordingState) {}

    fn on_playback_state_changed(&self, _state: &PlaybackState) {}

    /// Called at most once per amplitude interval.
    fn on_amplitude(&self, _level: f32) {}

    /// Called at most once per position interval, and once on completion.
    fn on_position(&self, _position: Duration, _duration: Duration) {}

    /// Recording elapsed time or playback source duration.
    fn on_duration(&self, _duration: Duration) {}

    fn on_playing_changed(&self, _playing: bool) {}

    fn on_buffering_changed(&self, _buffering: bool) {}
}
