use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::MemoError;

/// Configuration for the session manager and its helpers.
///
/// Every tunable constant of the core lives here so hosts can override it
/// from a JSON file; `Default` carries the observed production values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory where generated recording paths are placed.
    pub recordings_dir: PathBuf,

    /// Number of prepared playback sources kept warm (default: 5).
    pub source_cache_capacity: usize,

    /// Minimum spacing between pushed position updates (default: 500 ms).
    pub position_publish_interval_ms: u64,

    /// Minimum spacing between pushed amplitude samples (default: 100 ms).
    pub amplitude_publish_interval_ms: u64,

    /// Tick of the elapsed-time / position polling timer (default: 100 ms).
    pub duration_poll_interval_ms: u64,

    /// Added to the final recording duration to cover finalize latency (default: 100 ms).
    pub finalize_buffer_ms: u64,

    /// Upper bound on the reverse-geocoding wait when naming (default: 3 s).
    pub geocode_timeout_ms: u64,

    /// Soft-deleted recordings older than this are purged (default: 15 days).
    pub retention_days: u32,

    /// How often the retention sweeper runs (default: 1 hour).
    pub retention_sweep_interval_secs: u64,

    pub min_playback_speed: f32,
    pub max_playback_speed: f32,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), MemoError> {
        if self.source_cache_capacity == 0 {
            return Err(MemoError::InvalidParameter(
                "source cache capacity must be at least 1".into(),
            ));
        }
        if self.duration_poll_interval_ms == 0 {
            return Err(MemoError::InvalidParameter(
                "duration poll interval must be positive".into(),
            ));
        }
        if self.retention_sweep_interval_secs == 0 {
            return Err(MemoError::InvalidParameter(
                "retention sweep interval must be positive".into(),
            ));
        }
        if !(self.min_playback_speed > 0.0 && self.min_playback_speed <= self.max_playback_speed) {
            return Err(MemoError::InvalidParameter(format!(
                "invalid playback speed range: {}..={}",
                self.min_playback_speed, self.max_playback_speed
            )));
        }
        Ok(())
    }

    pub fn position_publish_interval(&self) -> Duration {
        Duration::from_millis(self.position_publish_interval_ms)
    }

    pub fn amplitude_publish_interval(&self) -> Duration {
        Duration::from_millis(self.amplitude_publish_interval_ms)
    }

    pub fn duration_poll_interval(&self) -> Duration {
        Duration::from_millis(self.duration_poll_interval_ms)
    }

    pub fn finalize_buffer(&self) -> Duration {
        Duration::from_millis(self.finalize_buffer_ms)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_millis(self.geocode_timeout_ms)
    }

    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * 24 * 60 * 60)
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_interval_secs)
    }

    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, MemoError> {
        let json = fs::read_to_string(path)
            .map_err(|e| MemoError::StorageError(format!("failed to read config: {}", e)))?;
        let config: SessionConfig = serde_json::from_str(&json)
            .map_err(|e| MemoError::StorageError(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<(), MemoError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MemoError::StorageError(format!("failed to serialize config: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| MemoError::StorageError(format!("failed to write config: {}", e)))?;
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from("."),
            source_cache_capacity: 5,
            position_publish_interval_ms: 500,
            amplitude_publish_interval_ms: 100,
            duration_poll_interval_ms: 100,
            finalize_buffer_ms: 100,
            geocode_timeout_ms: 3000,
            retention_days: 15,
            retention_sweep_interval_secs: 60 * 60,
            min_playback_speed: 0.5,
            max_playback_speed: 2.0,
        }
    }
}
