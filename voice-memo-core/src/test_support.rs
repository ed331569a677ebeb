//! Scripted collaborators shared by the unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::models::audio_models::{CaptureParams, PreparedSource, SourceHandle};
use crate::models::error::MemoError;
use crate::models::state::{PlaybackState, RecordingState};
use crate::traits::audio_files::AudioFiles;
use crate::traits::capture_device::{CaptureCallback, CaptureDevice, CaptureEvent};
use crate::traits::clock::Clock;
use crate::traits::location_provider::LocationProvider;
use crate::traits::permission_gate::PermissionGate;
use crate::traits::playback_device::{PlaybackCallback, PlaybackDevice, PlaybackEvent};
use crate::traits::session_observer::SessionObserver;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Default)]
pub struct MockCaptureDevice {
    pub calls: Mutex<Vec<&'static str>>,
    pub opened_path: Mutex<Option<PathBuf>>,
    callback: Mutex<Option<CaptureCallback>>,
    pub fail_open: AtomicBool,
    pub fail_finalize: AtomicBool,
}

impl MockCaptureDevice {
    /// Deliver an event as the device thread would.
    pub fn fire(&self, event: CaptureEvent) {
        let callback = self.callback.lock().clone();
        if let Some(cb) = callback {
            cb(event);
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn open(&self, path: &Path, _params: CaptureParams, callback: CaptureCallback) -> Result<(), MemoError> {
        self.calls.lock().push("open");
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(MemoError::DeviceError("microphone unavailable".into()));
        }
        *self.opened_path.lock() = Some(path.to_path_buf());
        *self.callback.lock() = Some(callback);
        Ok(())
    }

    fn pause(&self) -> Result<(), MemoError> {
        self.calls.lock().push("pause");
        Ok(())
    }

    fn resume(&self) -> Result<(), MemoError> {
        self.calls.lock().push("resume");
        Ok(())
    }

    fn finalize(&self) -> Result<(), MemoError> {
        self.calls.lock().push("finalize");
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(MemoError::DeviceError("encoder flush failed".into()));
        }
        Ok(())
    }

    fn cancel(&self) -> Result<(), MemoError> {
        self.calls.lock().push("cancel");
        Ok(())
    }
}

pub struct MockPlaybackDevice {
    pub calls: Mutex<Vec<String>>,
    pub durations: Mutex<HashMap<PathBuf, Duration>>,
    pub released: Mutex<Vec<SourceHandle>>,
    pub position: Mutex<Option<Duration>>,
    callback: Mutex<Option<PlaybackCallback>>,
    next_handle: AtomicU64,
    pub prepare_count: AtomicU64,
    pub fail_prepare: AtomicBool,
    pub fail_seek: AtomicBool,
}

impl MockPlaybackDevice {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            durations: Mutex::new(HashMap::new()),
            released: Mutex::new(Vec::new()),
            position: Mutex::new(None),
            callback: Mutex::new(None),
            next_handle: AtomicU64::new(1),
            prepare_count: AtomicU64::new(0),
            fail_prepare: AtomicBool::new(false),
            fail_seek: AtomicBool::new(false),
        }
    }

    /// Deliver an event; a position event also moves the polled position.
    pub fn fire(&self, event: PlaybackEvent) {
        if let PlaybackEvent::Position(p) = event {
            *self.position.lock() = Some(p);
        }
        let callback = self.callback.lock().clone();
        if let Some(cb) = callback {
            cb(event);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn prepares(&self) -> u64 {
        self.prepare_count.load(Ordering::SeqCst)
    }
}

impl PlaybackDevice for MockPlaybackDevice {
    fn prepare(&self, path: &Path) -> Result<PreparedSource, MemoError> {
        self.prepare_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(MemoError::DeviceError("decoder rejected file".into()));
        }
        let duration = self
            .durations
            .lock()
            .get(path)
            .copied()
            .unwrap_or(Duration::from_secs(60));
        Ok(PreparedSource {
            handle: SourceHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)),
            duration,
        })
    }

    fn play(&self, handle: SourceHandle, callback: PlaybackCallback) -> Result<(), MemoError> {
        self.calls.lock().push(format!("play {}", handle.0));
        *self.callback.lock() = Some(callback);
        *self.position.lock() = Some(Duration::ZERO);
        Ok(())
    }

    fn pause(&self) -> Result<(), MemoError> {
        self.calls.lock().push("pause".into());
        Ok(())
    }

    fn resume(&self) -> Result<(), MemoError> {
        self.calls.lock().push("resume".into());
        Ok(())
    }

    fn seek(&self, position: Duration) -> Result<(), MemoError> {
        if self.fail_seek.load(Ordering::SeqCst) {
            return Err(MemoError::DeviceError("seek failed".into()));
        }
        self.calls.lock().push(format!("seek {}", position.as_millis()));
        *self.position.lock() = Some(position);
        Ok(())
    }

    fn set_speed(&self, rate: f32) -> Result<(), MemoError> {
        self.calls.lock().push(format!("speed {}", rate));
        Ok(())
    }

    fn set_volume(&self, level: f32) -> Result<(), MemoError> {
        self.calls.lock().push(format!("volume {}", level));
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        *self.position.lock()
    }

    fn stop(&self) -> Result<(), MemoError> {
        self.calls.lock().push("stop".into());
        *self.position.lock() = None;
        Ok(())
    }

    fn release(&self, handle: SourceHandle) {
        self.released.lock().push(handle);
    }
}

/// In-memory file table: path → size.
#[derive(Default)]
pub struct MemoryFiles {
    pub files: Mutex<HashMap<PathBuf, u64>>,
    pub deleted: Mutex<Vec<PathBuf>>,
}

impl MemoryFiles {
    pub fn with_file(self, path: &str, size: u64) -> Self {
        self.files.lock().insert(PathBuf::from(path), size);
        self
    }

    pub fn add(&self, path: &Path, size: u64) {
        self.files.lock().insert(path.to_path_buf(), size);
    }
}

impl AudioFiles for MemoryFiles {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn size(&self, path: &Path) -> Result<u64, MemoError> {
        self.files
            .lock()
            .get(path)
            .copied()
            .ok_or_else(|| MemoError::FileNotFound(path.to_path_buf()))
    }

    fn delete(&self, path: &Path) -> Result<(), MemoError> {
        self.files.lock().remove(path);
        self.deleted.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// Location provider with a scripted answer and optional delay.
pub struct FixedLocation {
    answer: Result<String, MemoError>,
    delay: Duration,
    pub calls: AtomicU64,
}

impl FixedLocation {
    pub fn named(name: &str) -> Self {
        Self {
            answer: Ok(name.to_string()),
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err(MemoError::Unexpected("geocoder offline".into())),
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    pub fn slow(name: &str, delay: Duration) -> Self {
        Self {
            answer: Ok(name.to_string()),
            delay,
            calls: AtomicU64::new(0),
        }
    }
}

impl LocationProvider for FixedLocation {
    fn current_location_name(&self, _timeout: Duration) -> Result<String, MemoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.answer.clone()
    }
}

pub struct ToggleGate {
    pub granted: AtomicBool,
    pub grant_on_request: AtomicBool,
    pub requests: AtomicU64,
}

impl ToggleGate {
    pub fn granted() -> Self {
        Self {
            granted: AtomicBool::new(true),
            grant_on_request: AtomicBool::new(true),
            requests: AtomicU64::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: AtomicBool::new(false),
            grant_on_request: AtomicBool::new(false),
            requests: AtomicU64::new(0),
        }
    }
}

impl PermissionGate for ToggleGate {
    fn has_capture_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_capture_permission(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let grant = self.grant_on_request.load(Ordering::SeqCst);
        self.granted.store(grant, Ordering::SeqCst);
        grant
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    Recording(RecordingState),
    Playback(PlaybackState),
    Amplitude(f32),
    Position(Duration, Duration),
    Duration(Duration),
    Playing(bool),
    Buffering(bool),
}

/// Observer that keeps every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().clone()
    }

    pub fn positions(&self) -> Vec<(Duration, Duration)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Position(p, d) => Some((p, d)),
                _ => None,
            })
            .collect()
    }

    pub fn amplitudes(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Amplitude(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn playback_states(&self) -> Vec<PlaybackState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Playback(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn recording_states(&self) -> Vec<RecordingState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Recording(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_recording_state_changed(&self, state: &RecordingState) {
        self.events.lock().push(ObservedEvent::Recording(state.clone()));
    }

    fn on_playback_state_changed(&self, state: &PlaybackState) {
        self.events.lock().push(ObservedEvent::Playback(state.clone()));
    }

    fn on_amplitude(&self, level: f32) {
        self.events.lock().push(ObservedEvent::Amplitude(level));
    }

    fn on_position(&self, position: Duration, duration: Duration) {
        self.events.lock().push(ObservedEvent::Position(position, duration));
    }

    fn on_duration(&self, duration: Duration) {
        self.events.lock().push(ObservedEvent::Duration(duration));
    }

    fn on_playing_changed(&self, playing: bool) {
        self.events.lock().push(ObservedEvent::Playing(playing));
    }

    fn on_buffering_changed(&self, buffering: bool) {
        self.events.lock().push(ObservedEvent::Buffering(buffering));
    }
}
