use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MemoError;

/// Sample rates the capture path accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 7] = [8000, 11025, 16000, 22050, 32000, 44100, 48000];

/// Upper bound for lossy encoder bit rates, in bits per second.
pub const MAX_BIT_RATE: u32 = 320_000;

/// Container/codec of a recording file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    M4a,
    Aac,
    Wav,
    Flac,
    Opus,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::M4a => "m4a",
            Self::Aac => "aac",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Opus => "opus",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "m4a" => Some(Self::M4a),
            "aac" => Some(Self::Aac),
            "wav" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "opus" | "ogg" => Some(Self::Opus),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Lossless formats ignore the requested bit rate.
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Wav | Self::Flac)
    }
}

/// Capture parameters, fixed for the lifetime of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureParams {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub bit_rate: u32,
}

impl CaptureParams {
    pub fn new(format: AudioFormat, sample_rate: u32, bit_rate: u32) -> Self {
        Self {
            format,
            sample_rate,
            bit_rate,
        }
    }

    pub fn validate(&self) -> Result<(), MemoError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(MemoError::UnsupportedFormat(format!(
                "unsupported sample rate: {}",
                self.sample_rate
            )));
        }
        if !self.format.is_lossless() && (self.bit_rate == 0 || self.bit_rate > MAX_BIT_RATE) {
            return Err(MemoError::UnsupportedFormat(format!(
                "unsupported bit rate for {:?}: {}",
                self.format, self.bit_rate
            )));
        }
        Ok(())
    }
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            format: AudioFormat::M4a,
            sample_rate: 44100,
            bit_rate: 128_000,
        }
    }
}

/// Opaque identifier of a recording or playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Recording,
    Playback,
}

/// Returned to callers when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    pub kind: SessionKind,
}

/// Device-issued token for a prepared, ready-to-play audio source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// A prepared source together with the duration the device reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedSource {
    pub handle: SourceHandle,
    pub duration: Duration,
}
