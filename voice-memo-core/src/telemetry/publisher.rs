use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::audio_models::SessionId;
use crate::models::state::{PlaybackState, RecordingState};
use crate::traits::clock::Clock;
use crate::traits::session_observer::SessionObserver;

/// Latest telemetry values, readable at any time without subscribing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub amplitude: Option<f32>,
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
    pub playing: bool,
    pub buffering: bool,
}

/// Rate limiter keyed on the last emitted timestamp.
#[derive(Debug, Clone)]
struct Throttle {
    interval: Duration,
    last_emitted: Option<DateTime<Utc>>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emitted: None,
        }
    }

    /// Returns true and records `now` if an emission is due.
    fn ready(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_emitted {
            // A clock that stepped backwards yields Err and counts as due.
            if let Ok(since) = (now - last).to_std() {
                if since < self.interval {
                    return false;
                }
            }
        }
        self.last_emitted = Some(now);
        true
    }

    fn reset(&mut self) {
        self.last_emitted = None;
    }
}

struct PublisherState {
    active: Option<SessionId>,
    snapshot: TelemetrySnapshot,
    amplitude_throttle: Throttle,
    position_throttle: Throttle,
}

/// Bridges high-frequency device callbacks to session observers.
///
/// - Amplitude and position are always written to the snapshot, but pushed
///   to observers at most once per configured interval.
/// - Duration is pushed immediately on every update.
/// - Playing and buffering flags are pushed only when they change.
///
/// Only events tagged with the attached session id are accepted, so a
/// callback arriving after its session ended cannot change anything.
pub struct TelemetryPublisher {
    clock: Arc<dyn Clock>,
    state: Mutex<PublisherState>,
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
}

impl TelemetryPublisher {
    pub fn new(clock: Arc<dyn Clock>, amplitude_interval: Duration, position_interval: Duration) -> Self {
        Self {
            clock,
            state: Mutex::new(PublisherState {
                active: None,
                snapshot: TelemetrySnapshot::default(),
                amplitude_throttle: Throttle::new(amplitude_interval),
                position_throttle: Throttle::new(position_interval),
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.lock().push(observer);
    }

    pub fn clear_observers(&self) {
        self.observers.lock().clear();
    }

    /// Accept telemetry for `session` until the returned guard is dropped.
    ///
    /// Attaching replaces any previously attached session.
    pub fn attach(self: &Arc<Self>, session: SessionId) -> TelemetrySubscription {
        {
            let mut s = self.state.lock();
            if let Some(previous) = s.active.replace(session) {
                if previous != session {
                    log::debug!("telemetry moved from session {} to {}", previous, session);
                }
            }
            s.amplitude_throttle.reset();
            s.position_throttle.reset();
        }
        TelemetrySubscription {
            publisher: Arc::clone(self),
            session,
        }
    }

    /// Stop accepting telemetry for `session`. Returns false if it was not attached.
    pub fn detach(&self, session: SessionId) -> bool {
        let mut s = self.state.lock();
        if s.active == Some(session) {
            s.active = None;
            true
        } else {
            false
        }
    }

    pub fn is_attached(&self, session: SessionId) -> bool {
        self.state.lock().active == Some(session)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.state.lock().snapshot
    }

    /// Forget all values; called when a new session begins.
    pub fn reset_snapshot(&self) {
        self.state.lock().snapshot = TelemetrySnapshot::default();
    }

    /// Returns whether the sample was pushed to observers.
    pub fn publish_amplitude(&self, session: SessionId, level: f32) -> bool {
        let now = self.clock.now();
        {
            let mut s = self.state.lock();
            if s.active != Some(session) {
                return false;
            }
            s.snapshot.amplitude = Some(level);
            if !s.amplitude_throttle.ready(now) {
                return false;
            }
        }
        self.notify(|o| o.on_amplitude(level));
        true
    }

    /// Returns whether the position was pushed to observers.
    pub fn publish_position(&self, session: SessionId, position: Duration, duration: Duration) -> bool {
        let now = self.clock.now();
        {
            let mut s = self.state.lock();
            if s.active != Some(session) {
                return false;
            }
            s.snapshot.position = Some(position);
            if !s.position_throttle.ready(now) {
                return false;
            }
        }
        self.notify(|o| o.on_position(position, duration));
        true
    }

    /// Push a position bypassing the throttle (seek, completion).
    pub fn publish_position_now(&self, session: SessionId, position: Duration, duration: Duration) -> bool {
        let now = self.clock.now();
        {
            let mut s = self.state.lock();
            if s.active != Some(session) {
                return false;
            }
            s.snapshot.position = Some(position);
            s.position_throttle.last_emitted = Some(now);
        }
        self.notify(|o| o.on_position(position, duration));
        true
    }

    pub fn publish_duration(&self, session: SessionId, duration: Duration) -> bool {
        {
            let mut s = self.state.lock();
            if s.active != Some(session) {
                return false;
            }
            s.snapshot.duration = Some(duration);
        }
        self.notify(|o| o.on_duration(duration));
        true
    }

    /// Returns whether the flag changed (and was pushed).
    pub fn publish_playing(&self, session: SessionId, playing: bool) -> bool {
        {
            let mut s = self.state.lock();
            if s.active != Some(session) || s.snapshot.playing == playing {
                return false;
            }
            s.snapshot.playing = playing;
        }
        self.notify(|o| o.on_playing_changed(playing));
        true
    }

    pub fn publish_buffering(&self, session: SessionId, buffering: bool) -> bool {
        {
            let mut s = self.state.lock();
            if s.active != Some(session) || s.snapshot.buffering == buffering {
                return false;
            }
            s.snapshot.buffering = buffering;
        }
        self.notify(|o| o.on_buffering_changed(buffering));
        true
    }

    /// Telemetry is best effort: stream failures are logged and the session continues.
    pub fn report_stream_error(&self, session: SessionId, message: &str) {
        if self.is_attached(session) {
            log::warn!("telemetry stream error in session {}: {}", session, message);
        }
    }

    pub fn notify_recording_state(&self, state: &RecordingState) {
        self.notify(|o| o.on_recording_state_changed(state));
    }

    pub fn notify_playback_state(&self, state: &PlaybackState) {
        self.notify(|o| o.on_playback_state_changed(state));
    }

    fn notify(&self, f: impl Fn(&dyn SessionObserver)) {
        let observers = self.observers.lock().clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }
}

/// Scoped attachment of one session to the publisher; detaches on drop.
pub struct TelemetrySubscription {
    publisher: Arc<TelemetryPublisher>,
    session: SessionId,
}

impl TelemetrySubscription {
    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl Drop for TelemetrySubscription {
    fn drop(&mut self) {
        self.publisher.detach(self.session);
    }
}
