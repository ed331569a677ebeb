use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::models::audio_models::CaptureParams;
use crate::models::error::MemoError;

/// Raw event delivered by a capture device while it is open.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Input level as reported by the device.
    Amplitude(f32),
    /// Device-side recorded position.
    Position(Duration),
    /// The device's callback stream failed. Non-fatal to the session.
    Error(String),
}

/// Callback invoked from the device's own thread for every capture event.
///
/// Keep processing minimal; the session manager only gates and forwards.
pub type CaptureCallback = Arc<dyn Fn(CaptureEvent) + Send + Sync + 'static>;

/// Interface for the platform's microphone recorder.
///
/// The device is singly owned by the active recording session.
pub trait CaptureDevice: Send + Sync {
    /// Open the device and begin writing to `path`, delivering events via `callback`.
    fn open(&self, path: &Path, params: CaptureParams, callback: CaptureCallback) -> Result<(), MemoError>;

    /// Suspend capture; the device stops producing samples.
    fn pause(&self) -> Result<(), MemoError>;

    fn resume(&self) -> Result<(), MemoError>;

    /// Stop capture and finish writing the file.
    fn finalize(&self) -> Result<(), MemoError>;

    /// Stop capture without finalizing. The partial file is left for the caller to remove.
    fn cancel(&self) -> Result<(), MemoError>;
}
