use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::source_cache::SourceCache;
use crate::models::audio_models::{AudioFormat, CaptureParams, SessionHandle, SessionId, SessionKind, SourceHandle};
use crate::models::config::SessionConfig;
use crate::models::error::MemoError;
use crate::models::recording_record::RecordingRecord;
use crate::models::state::{PlaybackState, RecordingState};
use crate::naming::resolver::NamingResolver;
use crate::session::playback::PlaybackSession;
use crate::session::recording::RecordingSession;
use crate::session::timer::RepeatingTimer;
use crate::telemetry::publisher::{TelemetryPublisher, TelemetrySnapshot, TelemetrySubscription};
use crate::traits::audio_files::AudioFiles;
use crate::traits::capture_device::{CaptureDevice, CaptureEvent};
use crate::traits::clock::Clock;
use crate::traits::location_provider::LocationProvider;
use crate::traits::permission_gate::PermissionGate;
use crate::traits::playback_device::{PlaybackDevice, PlaybackEvent};
use crate::traits::recording_store::RecordingStore;
use crate::traits::session_observer::SessionObserver;

/// External services the session manager drives.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn CaptureDevice>,
    pub playback: Arc<dyn PlaybackDevice>,
    pub permissions: Arc<dyn PermissionGate>,
    pub location: Arc<dyn LocationProvider>,
    pub store: Arc<dyn RecordingStore>,
    pub files: Arc<dyn AudioFiles>,
    pub clock: Arc<dyn Clock>,
}

/// Mutable session state shared with device callbacks and timers,
/// protected by `parking_lot::Mutex`.
struct SessionState {
    recording_state: RecordingState,
    playback_state: PlaybackState,
    recording: Option<RecordingSession>,
    playback: Option<PlaybackSession>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            recording_state: RecordingState::Idle,
            playback_state: PlaybackState::Idle,
            recording: None,
            playback: None,
        }
    }

    fn is_current_playback(&self, id: SessionId) -> bool {
        self.playback
            .as_ref()
            .map_or(false, |p| p.id == id && !p.has_completed_current_playback)
    }
}

/// Timer and telemetry attachment of one session. Dropping it stops the
/// timer thread first, then detaches telemetry.
#[derive(Default)]
struct ActiveGuards {
    timer: Option<RepeatingTimer>,
    subscription: Option<TelemetrySubscription>,
}

/// Result of applying a playback event under the lock; acted on after release.
enum PlaybackUpdate {
    Position { position: Duration, duration: Duration },
    Duration(Duration),
    Completed(Duration),
    Playing(bool),
    Buffering(bool),
    StreamError(String),
}

/// Owns the single active recording or playback session.
///
/// Recording and playback are mutually exclusive: starting one force-ends the
/// other. Intents take `&mut self` and are therefore serialized; device
/// callbacks and poll timers only touch the shared state behind a short lock
/// and are ignored once their session is no longer current.
///
/// ```text
/// [CaptureDevice] ─ events ─┐
///                            ├→ [SessionManager] → [TelemetryPublisher] → observers
/// [PlaybackDevice] ─ events ┘          │
///                                       ├→ [SourceCache] (prepared sources)
///                                       └→ [NamingResolver] → RecordingRecord
/// ```
///
/// Construct one per process at the composition root and share it behind the
/// host's own lock.
pub struct SessionManager {
    config: SessionConfig,
    capture: Arc<dyn CaptureDevice>,
    player: Arc<dyn PlaybackDevice>,
    permissions: Arc<dyn PermissionGate>,
    store: Arc<dyn RecordingStore>,
    files: Arc<dyn AudioFiles>,
    clock: Arc<dyn Clock>,
    naming: NamingResolver,
    cache: SourceCache,
    telemetry: Arc<TelemetryPublisher>,
    session_state: Arc<Mutex<SessionState>>,
    recording_guards: Option<ActiveGuards>,
    playback_guards: Option<ActiveGuards>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Result<Self, MemoError> {
        config.validate()?;

        let Collaborators {
            capture,
            playback,
            permissions,
            location,
            store,
            files,
            clock,
        } = collaborators;

        let release_player = Arc::clone(&playback);
        let cache = SourceCache::new(
            config.source_cache_capacity,
            Arc::new(move |handle: SourceHandle| release_player.release(handle)),
        );
        let telemetry = Arc::new(TelemetryPublisher::new(
            Arc::clone(&clock),
            config.amplitude_publish_interval(),
            config.position_publish_interval(),
        ));
        let naming = NamingResolver::new(location, Arc::clone(&clock), config.geocode_timeout());

        Ok(Self {
            config,
            capture,
            player: playback,
            permissions,
            store,
            files,
            clock,
            naming,
            cache,
            telemetry,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            recording_guards: None,
            playback_guards: None,
        })
    }

    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.telemetry.add_observer(observer);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn recording_state(&self) -> RecordingState {
        self.session_state.lock().recording_state.clone()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.session_state.lock().playback_state.clone()
    }

    pub fn recording_session(&self) -> Option<RecordingSession> {
        self.session_state.lock().recording.clone()
    }

    pub fn playback_session(&self) -> Option<PlaybackSession> {
        self.session_state.lock().playback.clone()
    }

    /// Live recorded time of the active recording, pauses excluded.
    pub fn recording_elapsed(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.session_state.lock().recording.as_ref().map(|r| r.elapsed(now))
    }

    pub fn playback_position(&self) -> Option<Duration> {
        self.session_state.lock().playback.as_ref().map(|p| p.position)
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn source_cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Drop a cached source, e.g. after its recording was deleted.
    pub fn forget_source(&mut self, path: &Path) -> bool {
        self.cache.remove(path)
    }

    // --- Recording ---

    /// Start recording into a generated file under `recordings_dir`.
    pub fn start_recording(
        &mut self,
        folder_id: &str,
        format: AudioFormat,
        sample_rate: u32,
        bit_rate: u32,
    ) -> Result<SessionHandle, MemoError> {
        let file_name = format!("recording_{}.{}", uuid::Uuid::new_v4(), format.extension());
        let path = self.config.recordings_dir.join(file_name);
        self.start_recording_to(path, folder_id, CaptureParams::new(format, sample_rate, bit_rate))
    }

    /// Start recording into `path`. Transitions: idle → starting → recording.
    ///
    /// Active playback is stopped first; playback always yields to recording.
    pub fn start_recording_to(
        &mut self,
        path: PathBuf,
        folder_id: &str,
        params: CaptureParams,
    ) -> Result<SessionHandle, MemoError> {
        if !self.session_state.lock().recording_state.is_inactive() {
            return Err(MemoError::DeviceBusy);
        }

        params.validate()?;

        if !self.permissions.has_capture_permission() && !self.permissions.request_capture_permission() {
            return Err(MemoError::PermissionDenied);
        }

        if !self.session_state.lock().playback_state.is_idle() {
            log::info!("stopping playback to start recording");
            if let Err(e) = self.stop_playback() {
                log::warn!("playback did not stop cleanly: {}", e);
            }
        }

        self.set_recording_state(RecordingState::Starting);
        self.telemetry.reset_snapshot();

        let id = SessionId::new();
        let shared = Arc::clone(&self.session_state);
        let telemetry = Arc::clone(&self.telemetry);
        let callback = Arc::new(move |event: CaptureEvent| {
            Self::handle_capture_event(&shared, &telemetry, id, event);
        });

        if let Err(e) = self.capture.open(&path, params, callback) {
            let err = device_error(e);
            log::error!("failed to open capture device: {}", err);
            self.set_recording_state(RecordingState::Failed(err.clone()));
            return Err(err);
        }

        let session = RecordingSession::new(id, path, folder_id, params, self.clock.now());
        {
            let mut s = self.session_state.lock();
            s.recording = Some(session);
            s.recording_state = RecordingState::Recording {
                elapsed: Duration::ZERO,
            };
        }
        self.notify_recording_state();

        if let Err(e) = self.attach_recording_telemetry(id) {
            log::error!("failed to start recording timer: {}", e);
            self.abort_recording(RecordingState::Failed(e.clone()));
            return Err(e);
        }

        log::info!("recording session {} started", id);
        Ok(SessionHandle {
            id,
            kind: SessionKind::Recording,
        })
    }

    /// Transitions: recording → paused. Amplitude telemetry stops until resume.
    pub fn pause_recording(&mut self) -> Result<(), MemoError> {
        {
            let s = self.session_state.lock();
            if !s.recording_state.is_recording() {
                return Err(MemoError::invalid_state("pause recording", &s.recording_state));
            }
        }

        self.capture.pause().map_err(device_error)?;
        self.recording_guards = None;

        let now = self.clock.now();
        {
            let mut s = self.session_state.lock();
            let state = &mut *s;
            if let Some(recording) = state.recording.as_mut() {
                recording.begin_pause(now);
                state.recording_state = RecordingState::Paused {
                    elapsed: recording.elapsed(now),
                };
            }
        }
        self.notify_recording_state();
        Ok(())
    }

    /// Transitions: paused → recording.
    pub fn resume_recording(&mut self) -> Result<(), MemoError> {
        let id = {
            let s = self.session_state.lock();
            match (&s.recording_state, s.recording.as_ref()) {
                (RecordingState::Paused { .. }, Some(recording)) => recording.id,
                _ => return Err(MemoError::invalid_state("resume recording", &s.recording_state)),
            }
        };

        self.capture.resume().map_err(device_error)?;

        let now = self.clock.now();
        {
            let mut s = self.session_state.lock();
            let state = &mut *s;
            if let Some(recording) = state.recording.as_mut() {
                recording.end_pause(now);
                state.recording_state = RecordingState::Recording {
                    elapsed: recording.elapsed(now),
                };
            }
        }
        self.notify_recording_state();

        if let Err(e) = self.attach_recording_telemetry(id) {
            log::warn!("recording resumed without telemetry: {}", e);
        }
        Ok(())
    }

    /// Stop, finalize the file, and build the record. The record is not persisted.
    ///
    /// Transitions: recording/paused → stopping → completed / failed. The
    /// session is reset on either outcome.
    pub fn stop_recording(&mut self) -> Result<RecordingRecord, MemoError> {
        {
            let s = self.session_state.lock();
            if !s.recording_state.is_recording() && !s.recording_state.is_paused() {
                return Err(MemoError::invalid_state("stop recording", &s.recording_state));
            }
        }

        let now = self.clock.now();
        self.set_recording_state(RecordingState::Stopping);
        self.recording_guards = None;

        let session = self
            .session_state
            .lock()
            .recording
            .take()
            .ok_or_else(|| MemoError::Unexpected("recording state without session".into()))?;
        let elapsed = session.elapsed(now);

        if let Err(e) = self.capture.finalize() {
            let err = device_error(e);
            log::error!("failed to finalize recording {}: {}", session.file_path.display(), err);
            self.set_recording_state(RecordingState::Failed(err.clone()));
            return Err(err);
        }

        let duration = elapsed + self.config.finalize_buffer();
        let file_size_bytes = self.files.size(&session.file_path).unwrap_or_else(|e| {
            log::warn!("could not read size of {}: {}", session.file_path.display(), e);
            0
        });

        let existing_names: Vec<String> = match self.store.query(Some(session.folder_id.as_str()), false) {
            Ok(records) => records.into_iter().map(|r| r.name).collect(),
            Err(e) => {
                log::warn!("could not list names in folder {}: {}", session.folder_id, e);
                Vec::new()
            }
        };
        let name = self.naming.resolve(&existing_names);

        let record = RecordingRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            file_path: session.file_path,
            folder_id: session.folder_id,
            format: session.params.format,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            file_size_bytes,
            sample_rate: session.params.sample_rate,
            is_favorite: false,
            is_deleted: false,
            deleted_at: None,
            created_at: session.started_at,
            updated_at: now,
        };

        log::info!(
            "recording session {} completed: {:?} ({} ms)",
            session.id,
            record.name,
            record.duration_ms
        );
        self.set_recording_state(RecordingState::Completed(Box::new(record.clone())));
        Ok(record)
    }

    /// `stop_recording`, then persist through the store.
    ///
    /// A persistence failure is returned as `StorageError` and the state
    /// drops back to idle; the finalized audio file is kept.
    pub fn stop_recording_and_save(&mut self) -> Result<RecordingRecord, MemoError> {
        let record = self.stop_recording()?;
        if let Err(e) = self.store.create(&record) {
            log::error!("failed to save recording {}: {}", record.file_path.display(), e);
            self.set_recording_state(RecordingState::Idle);
            return Err(match e {
                MemoError::StorageError(_) => e,
                other => MemoError::StorageError(other.to_string()),
            });
        }
        Ok(record)
    }

    /// Discard the recording and its partial file. Never names or persists.
    ///
    /// From a terminal state there is nothing to discard; the state is reset
    /// to idle. Only an idle manager rejects the call.
    pub fn cancel_recording(&mut self) -> Result<(), MemoError> {
        let state = self.recording_state();
        if state.is_idle() {
            return Err(MemoError::invalid_state("cancel recording", &state));
        }
        if state.is_terminal() {
            self.set_recording_state(RecordingState::Idle);
            return Ok(());
        }

        self.abort_recording(RecordingState::Cancelled);
        Ok(())
    }

    // --- Playback ---

    /// Start playing `path` from the beginning. Transitions: idle → loading → playing.
    ///
    /// The file is validated before anything else changes; an active
    /// recording is then stopped and saved.
    pub fn start_playback(&mut self, path: impl AsRef<Path>) -> Result<SessionHandle, MemoError> {
        let path = path.as_ref().to_path_buf();
        self.validate_playable(&path)?;

        if !self.session_state.lock().recording_state.is_inactive() {
            self.force_stop_recording();
        }
        if !self.session_state.lock().playback_state.is_idle() {
            if let Err(e) = self.stop_playback() {
                log::warn!("previous playback did not stop cleanly: {}", e);
            }
        }

        self.set_playback_state(PlaybackState::Loading);

        let source = match self.cache.get(&path) {
            Some(source) => source,
            None => match self.player.prepare(&path) {
                Ok(source) => {
                    self.cache.put(path.clone(), source);
                    source
                }
                Err(e) => {
                    let err = device_error(e);
                    log::error!("failed to prepare {}: {}", path.display(), err);
                    self.set_playback_state(PlaybackState::Failed(err.clone()));
                    return Err(err);
                }
            },
        };

        let id = SessionId::new();
        self.session_state.lock().playback = Some(PlaybackSession::new(id, path.clone(), source));
        self.telemetry.reset_snapshot();
        let subscription = self.telemetry.attach(id);

        let shared = Arc::clone(&self.session_state);
        let telemetry = Arc::clone(&self.telemetry);
        let callback = Arc::new(move |event: PlaybackEvent| {
            Self::handle_playback_event(&shared, &telemetry, id, event);
        });

        if let Err(e) = self.player.play(source.handle, callback) {
            let err = device_error(e);
            log::error!("failed to play {}: {}", path.display(), err);
            drop(subscription);
            {
                let mut s = self.session_state.lock();
                s.playback = None;
                s.playback_state = PlaybackState::Failed(err.clone());
            }
            self.notify_playback_state();
            return Err(err);
        }

        {
            let mut s = self.session_state.lock();
            // The device may already have reported completion.
            if s.is_current_playback(id) {
                s.playback_state = PlaybackState::Playing {
                    position: Duration::ZERO,
                    duration: source.duration,
                };
            }
        }
        self.notify_playback_state();
        self.telemetry.publish_duration(id, source.duration);
        self.telemetry.publish_playing(id, true);

        let timer = match self.start_playback_timer(id) {
            Ok(timer) => Some(timer),
            Err(e) => {
                log::warn!("playback position polling unavailable: {}", e);
                None
            }
        };
        self.playback_guards = Some(ActiveGuards {
            timer,
            subscription: Some(subscription),
        });

        log::info!("playback session {} started for {}", id, path.display());
        Ok(SessionHandle {
            id,
            kind: SessionKind::Playback,
        })
    }

    /// Transitions: playing → paused.
    pub fn pause_playback(&mut self) -> Result<(), MemoError> {
        let id = self.playback_id_in("pause playback", |s| s.is_playing())?;

        self.player.pause().map_err(device_error)?;
        if let Some(guards) = self.playback_guards.as_mut() {
            guards.timer = None;
        }

        {
            let mut s = self.session_state.lock();
            let state = &mut *s;
            if let Some(playback) = state.playback.as_ref() {
                state.playback_state = PlaybackState::Paused {
                    position: playback.position,
                    duration: playback.duration,
                };
            }
        }
        self.telemetry.publish_playing(id, false);
        self.notify_playback_state();
        Ok(())
    }

    /// Transitions: paused → playing.
    pub fn resume_playback(&mut self) -> Result<(), MemoError> {
        let id = self.playback_id_in("resume playback", |s| s.is_paused())?;

        self.player.resume().map_err(device_error)?;

        {
            let mut s = self.session_state.lock();
            let state = &mut *s;
            if let Some(playback) = state.playback.as_ref() {
                state.playback_state = PlaybackState::Playing {
                    position: playback.position,
                    duration: playback.duration,
                };
            }
        }
        self.telemetry.publish_playing(id, true);
        self.notify_playback_state();

        match self.start_playback_timer(id) {
            Ok(timer) => {
                self.playback_guards.get_or_insert_with(ActiveGuards::default).timer = Some(timer);
            }
            Err(e) => log::warn!("playback position polling unavailable: {}", e),
        }
        Ok(())
    }

    /// Seek to `position_secs`, which must lie within `0..=duration`.
    ///
    /// Out-of-range positions are rejected with `InvalidSeekPosition` rather
    /// than clamped; callers clamp. Seeking a completed playback re-arms it
    /// in the paused state.
    pub fn seek_playback(&mut self, position_secs: f64) -> Result<(), MemoError> {
        let (id, duration) = {
            let s = self.session_state.lock();
            match (&s.playback_state, s.playback.as_ref()) {
                (
                    PlaybackState::Playing { .. } | PlaybackState::Paused { .. } | PlaybackState::Completed { .. },
                    Some(playback),
                ) => (playback.id, playback.duration),
                _ => return Err(MemoError::invalid_state("seek playback", &s.playback_state)),
            }
        };

        if !position_secs.is_finite() || position_secs < 0.0 || position_secs > duration.as_secs_f64() {
            return Err(MemoError::InvalidSeekPosition {
                position_secs,
                duration_secs: duration.as_secs_f64(),
            });
        }
        let position = Duration::from_secs_f64(position_secs).min(duration);

        self.player.seek(position).map_err(device_error)?;

        let rearmed = {
            let mut s = self.session_state.lock();
            let state = &mut *s;
            let Some(playback) = state.playback.as_mut() else {
                return Err(MemoError::Unexpected("playback session vanished during seek".into()));
            };
            playback.position = position;
            let rearmed = playback.has_completed_current_playback;
            playback.has_completed_current_playback = false;
            state.playback_state = match state.playback_state {
                PlaybackState::Playing { .. } => PlaybackState::Playing { position, duration },
                _ => PlaybackState::Paused { position, duration },
            };
            rearmed
        };

        if rearmed {
            // The old guard detaches this same id on drop, so it must go first.
            let guards = self.playback_guards.get_or_insert_with(ActiveGuards::default);
            guards.timer = None;
            guards.subscription = None;
            guards.subscription = Some(self.telemetry.attach(id));
        }
        self.telemetry.publish_position_now(id, position, duration);
        self.notify_playback_state();
        Ok(())
    }

    pub fn set_speed(&mut self, rate: f32) -> Result<(), MemoError> {
        self.playback_id_in("set speed", |s| s.is_active())?;
        let (min, max) = (self.config.min_playback_speed, self.config.max_playback_speed);
        if !rate.is_finite() || rate < min || rate > max {
            return Err(MemoError::InvalidParameter(format!(
                "playback speed {} outside {}..={}",
                rate, min, max
            )));
        }

        self.player.set_speed(rate).map_err(device_error)?;
        if let Some(playback) = self.session_state.lock().playback.as_mut() {
            playback.speed = rate;
        }
        Ok(())
    }

    pub fn set_volume(&mut self, level: f32) -> Result<(), MemoError> {
        self.playback_id_in("set volume", |s| s.is_active())?;
        if !(0.0..=1.0).contains(&level) {
            return Err(MemoError::InvalidParameter(format!("volume {} outside 0..=1", level)));
        }

        self.player.set_volume(level).map_err(device_error)?;
        if let Some(playback) = self.session_state.lock().playback.as_mut() {
            playback.volume = level;
        }
        Ok(())
    }

    /// Stop playback and release the device's active source. The cache entry
    /// for the file is kept. Safe from any non-idle playback state.
    pub fn stop_playback(&mut self) -> Result<(), MemoError> {
        let id = {
            let s = self.session_state.lock();
            if s.playback_state.is_idle() {
                return Err(MemoError::invalid_state("stop playback", &s.playback_state));
            }
            s.playback.as_ref().map(|p| p.id)
        };

        self.set_playback_state(PlaybackState::Stopping);
        if let Some(id) = id {
            self.telemetry.publish_playing(id, false);
        }
        self.playback_guards = None;

        let result = self.player.stop();
        {
            let mut s = self.session_state.lock();
            s.playback = None;
            s.playback_state = PlaybackState::Idle;
        }
        self.notify_playback_state();

        result.map_err(device_error)
    }

    /// Detach every observer added with `add_observer`.
    pub fn clear_observers(&self) {
        self.telemetry.clear_observers();
    }

    /// Cancel any recording, stop playback, release every cached source,
    /// then detach observers.
    pub fn shutdown(&mut self) {
        if !self.session_state.lock().recording_state.is_inactive() {
            self.abort_recording(RecordingState::Cancelled);
        }
        if !self.session_state.lock().playback_state.is_idle() {
            if let Err(e) = self.stop_playback() {
                log::warn!("playback did not stop cleanly on shutdown: {}", e);
            }
        }
        self.cache.clear();
        self.telemetry.clear_observers();
    }

    // --- Internal helpers ---

    fn set_recording_state(&self, new_state: RecordingState) {
        log::debug!("recording state → {:?}", new_state);
        self.session_state.lock().recording_state = new_state.clone();
        self.telemetry.notify_recording_state(&new_state);
    }

    fn set_playback_state(&self, new_state: PlaybackState) {
        log::debug!("playback state → {:?}", new_state);
        self.session_state.lock().playback_state = new_state.clone();
        self.telemetry.notify_playback_state(&new_state);
    }

    fn notify_recording_state(&self) {
        let state = self.recording_state();
        self.telemetry.notify_recording_state(&state);
    }

    fn notify_playback_state(&self) {
        let state = self.playback_state();
        self.telemetry.notify_playback_state(&state);
    }

    /// Id of the playback session if its state satisfies `valid`.
    fn playback_id_in(
        &self,
        operation: &str,
        valid: impl Fn(&PlaybackState) -> bool,
    ) -> Result<SessionId, MemoError> {
        let s = self.session_state.lock();
        match s.playback.as_ref() {
            Some(playback) if valid(&s.playback_state) => Ok(playback.id),
            _ => Err(MemoError::invalid_state(operation, &s.playback_state)),
        }
    }

    fn validate_playable(&self, path: &Path) -> Result<(), MemoError> {
        if !self.files.exists(path) {
            return Err(MemoError::FileNotFound(path.to_path_buf()));
        }
        if self.files.size(path)? == 0 {
            return Err(MemoError::EmptyFile(path.to_path_buf()));
        }
        if AudioFormat::from_path(path).is_none() {
            return Err(MemoError::UnsupportedFormat(path.display().to_string()));
        }
        Ok(())
    }

    /// Tear down the recording without finalizing: stop telemetry, cancel
    /// the device, delete the partial file, reset the session.
    fn abort_recording(&mut self, final_state: RecordingState) {
        self.recording_guards = None;
        let session = self.session_state.lock().recording.take();

        if let Err(e) = self.capture.cancel() {
            log::warn!("capture device did not cancel cleanly: {}", e);
        }
        if let Some(session) = &session {
            if let Err(e) = self.files.delete(&session.file_path) {
                log::warn!("failed to delete partial recording {}: {}", session.file_path.display(), e);
            }
            log::info!("recording session {} discarded", session.id);
        }
        self.set_recording_state(final_state);
    }

    /// Recording yields to playback by stopping and saving, never discarding.
    fn force_stop_recording(&mut self) {
        let state = self.recording_state();
        if state.is_recording() || state.is_paused() {
            log::info!("stopping recording to start playback");
            if let Err(e) = self.stop_recording_and_save() {
                log::error!("recording stopped for playback could not be saved: {}", e);
            }
        } else {
            self.abort_recording(RecordingState::Cancelled);
        }
    }

    fn attach_recording_telemetry(&mut self, id: SessionId) -> Result<(), MemoError> {
        let subscription = self.telemetry.attach(id);
        let timer = self.start_recording_timer(id)?;
        self.recording_guards = Some(ActiveGuards {
            timer: Some(timer),
            subscription: Some(subscription),
        });
        Ok(())
    }

    /// Refresh elapsed time every poll interval and push it as duration.
    fn start_recording_timer(&self, id: SessionId) -> Result<RepeatingTimer, MemoError> {
        let shared = Arc::clone(&self.session_state);
        let telemetry = Arc::clone(&self.telemetry);
        let clock = Arc::clone(&self.clock);

        RepeatingTimer::start("recording-duration", self.config.duration_poll_interval(), move || {
            let elapsed = {
                let mut s = shared.lock();
                let state = &mut *s;
                let Some(recording) = state.recording.as_ref().filter(|r| r.id == id) else {
                    return false;
                };
                if !state.recording_state.is_recording() {
                    return false;
                }
                let elapsed = recording.elapsed(clock.now());
                state.recording_state = RecordingState::Recording { elapsed };
                elapsed
            };
            telemetry.publish_duration(id, elapsed);
            true
        })
    }

    /// Poll the device position every interval; this also catches overrun
    /// when the device sends no position events of its own.
    fn start_playback_timer(&self, id: SessionId) -> Result<RepeatingTimer, MemoError> {
        let shared = Arc::clone(&self.session_state);
        let telemetry = Arc::clone(&self.telemetry);
        let player = Arc::clone(&self.player);

        RepeatingTimer::start("playback-position", self.config.duration_poll_interval(), move || {
            if let Some(position) = player.position() {
                Self::handle_playback_event(&shared, &telemetry, id, PlaybackEvent::Position(position));
            }
            let s = shared.lock();
            s.is_current_playback(id) && s.playback_state.is_playing()
        })
    }

    fn handle_capture_event(
        shared: &Mutex<SessionState>,
        telemetry: &TelemetryPublisher,
        id: SessionId,
        event: CaptureEvent,
    ) {
        let active = {
            let s = shared.lock();
            s.recording_state.is_recording() && s.recording.as_ref().map_or(false, |r| r.id == id)
        };
        if !active {
            return;
        }

        match event {
            CaptureEvent::Amplitude(level) => {
                telemetry.publish_amplitude(id, level);
            }
            CaptureEvent::Position(position) => {
                telemetry.publish_position(id, position, position);
            }
            CaptureEvent::Error(message) => telemetry.report_stream_error(id, &message),
        }
    }

    fn handle_playback_event(
        shared: &Mutex<SessionState>,
        telemetry: &TelemetryPublisher,
        id: SessionId,
        event: PlaybackEvent,
    ) {
        let update = {
            let mut s = shared.lock();
            if !s.is_current_playback(id) {
                return;
            }
            let state = &mut *s;
            let Some(playback) = state.playback.as_mut() else {
                return;
            };

            match event {
                PlaybackEvent::Position(position) if playback.is_overrun(position) => {
                    playback.complete();
                    state.playback_state = PlaybackState::Completed {
                        duration: playback.duration,
                    };
                    PlaybackUpdate::Completed(playback.duration)
                }
                PlaybackEvent::Completed => {
                    playback.complete();
                    state.playback_state = PlaybackState::Completed {
                        duration: playback.duration,
                    };
                    PlaybackUpdate::Completed(playback.duration)
                }
                PlaybackEvent::Position(position) => {
                    playback.position = position;
                    let duration = playback.duration;
                    match &mut state.playback_state {
                        PlaybackState::Playing { position: p, .. } | PlaybackState::Paused { position: p, .. } => {
                            *p = position;
                        }
                        _ => {}
                    }
                    PlaybackUpdate::Position { position, duration }
                }
                PlaybackEvent::Duration(duration) => {
                    playback.duration = duration;
                    // A shorter duration may leave the last position past the end.
                    if playback.is_overrun(playback.position) {
                        playback.complete();
                        state.playback_state = PlaybackState::Completed { duration };
                        PlaybackUpdate::Completed(duration)
                    } else {
                        match &mut state.playback_state {
                            PlaybackState::Playing { duration: d, .. } | PlaybackState::Paused { duration: d, .. } => {
                                *d = duration;
                            }
                            _ => {}
                        }
                        PlaybackUpdate::Duration(duration)
                    }
                }
                PlaybackEvent::Playing(playing) => PlaybackUpdate::Playing(playing),
                PlaybackEvent::Buffering(buffering) => PlaybackUpdate::Buffering(buffering),
                PlaybackEvent::Error(message) => PlaybackUpdate::StreamError(message),
            }
        };

        match update {
            PlaybackUpdate::Position { position, duration } => {
                telemetry.publish_position(id, position, duration);
            }
            PlaybackUpdate::Duration(duration) => {
                telemetry.publish_duration(id, duration);
            }
            PlaybackUpdate::Completed(duration) => {
                telemetry.publish_position_now(id, duration, duration);
                telemetry.publish_playing(id, false);
                telemetry.detach(id);
                telemetry.notify_playback_state(&PlaybackState::Completed { duration });
                log::info!("playback session {} completed", id);
            }
            PlaybackUpdate::Playing(playing) => {
                telemetry.publish_playing(id, playing);
            }
            PlaybackUpdate::Buffering(buffering) => {
                telemetry.publish_buffering(id, buffering);
            }
            PlaybackUpdate::StreamError(message) => telemetry.report_stream_error(id, &message),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Device failures surface as `DeviceError`; permission refusals stay distinct.
fn device_error(e: MemoError) -> MemoError {
    match e {
        MemoError::DeviceError(_) | MemoError::PermissionDenied | MemoError::DeviceBusy => e,
        other => MemoError::DeviceError(other.to_string()),
    }
}
