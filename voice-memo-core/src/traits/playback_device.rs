use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::models::audio_models::{PreparedSource, SourceHandle};
use crate::models::error::MemoError;

/// Raw event delivered by a playback device for the source it is playing.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Position(Duration),
    Duration(Duration),
    /// The device reached end of file.
    Completed,
    Playing(bool),
    Buffering(bool),
    Error(String),
}

pub type PlaybackCallback = Arc<dyn Fn(PlaybackEvent) + Send + Sync + 'static>;

/// Interface for the platform's audio player.
///
/// Prepared sources outlive a single playback; the source cache decides when
/// to `release` them.
pub trait PlaybackDevice: Send + Sync {
    /// Decode headers and buffer `path` so it can start without delay.
    fn prepare(&self, path: &Path) -> Result<PreparedSource, MemoError>;

    /// Start playing a prepared source from the beginning.
    fn play(&self, handle: SourceHandle, callback: PlaybackCallback) -> Result<(), MemoError>;

    fn pause(&self) -> Result<(), MemoError>;

    fn resume(&self) -> Result<(), MemoError>;

    fn seek(&self, position: Duration) -> Result<(), MemoError>;

    fn set_speed(&self, rate: f32) -> Result<(), MemoError>;

    fn set_volume(&self, level: f32) -> Result<(), MemoError>;

    /// Current position of the active playback, polled by the session timer.
    fn position(&self) -> Option<Duration>;

    /// Stop the active playback. Prepared sources stay valid.
    fn stop(&self) -> Result<(), MemoError>;

    /// Free the resources held by a prepared source.
    fn release(&self, handle: SourceHandle);
}
