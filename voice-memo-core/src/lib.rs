//! # voice-memo-core
//!
//! Platform-agnostic core of a voice memo app.
//!
//! Owns the recording and playback session lifecycle, throttled telemetry,
//! prepared-source caching, recording naming and folder statistics.
//! Platform backends (microphone encoder, audio player, geocoder, database)
//! implement the traits in [`traits`] and plug into [`SessionManager`].
//!
//! ## Architecture
//!
//! ```text
//! voice-memo-core (this crate)
//! ├── traits/     ← CaptureDevice, PlaybackDevice, RecordingStore, LocationProvider, SessionObserver, ...
//! ├── models/     ← MemoError, RecordingState, PlaybackState, SessionConfig, RecordingRecord, FolderScope
//! ├── session/    ← SessionManager (orchestrator), RecordingSession, PlaybackSession, RepeatingTimer
//! ├── telemetry/  ← TelemetryPublisher (throttled, session-gated observer fan-out)
//! ├── cache/      ← SourceCache (LRU of prepared playback sources)
//! ├── naming/     ← NamingResolver (location name + numeric disambiguation)
//! ├── stats/      ← StatsAggregator (per-folder count / duration / size)
//! └── storage/    ← InMemoryRecordingStore, JsonRecordingStore, RetentionSweeper
//! ```

pub mod cache;
pub mod models;
pub mod naming;
pub mod session;
pub mod stats;
pub mod storage;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use cache::source_cache::SourceCache;
pub use models::audio_models::{AudioFormat, CaptureParams, PreparedSource, SessionHandle, SessionId, SessionKind, SourceHandle};
pub use models::config::SessionConfig;
pub use models::error::MemoError;
pub use models::folder::{FolderScope, FolderStats};
pub use models::recording_record::RecordingRecord;
pub use models::state::{PlaybackState, RecordingState};
pub use naming::resolver::NamingResolver;
pub use session::manager::{Collaborators, SessionManager};
pub use stats::aggregator::StatsAggregator;
pub use storage::json_store::JsonRecordingStore;
pub use storage::memory_store::InMemoryRecordingStore;
pub use storage::retention::RetentionSweeper;
pub use telemetry::publisher::{TelemetryPublisher, TelemetrySnapshot};
pub use traits::audio_files::{AudioFiles, LocalFiles};
pub use traits::capture_device::{CaptureCallback, CaptureDevice, CaptureEvent};
pub use traits::clock::{Clock, SystemClock};
pub use traits::location_provider::LocationProvider;
pub use traits::permission_gate::PermissionGate;
pub use traits::playback_device::{PlaybackCallback, PlaybackDevice, PlaybackEvent};
pub use traits::recording_store::RecordingStore;
pub use traits::session_observer::SessionObserver;
