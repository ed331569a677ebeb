use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the session manager and its collaborators.
///
/// Permission and device failures are kept distinct so a UI can decide
/// between prompting for access and showing a generic failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MemoError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device busy")]
    DeviceBusy,

    #[error("device error: {0}")]
    DeviceError(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid seek position {position_secs}s (duration {duration_secs}s)")]
    InvalidSeekPosition { position_secs: f64, duration_secs: f64 },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("file is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("timeout")]
    Timeout,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl MemoError {
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }

    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceBusy | Self::DeviceError(_))
    }

    pub(crate) fn invalid_state(operation: &str, state: impl std::fmt::Debug) -> Self {
        Self::InvalidState(format!("cannot {} while {:?}", operation, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_and_device_errors_are_distinguishable() {
        assert!(MemoError::PermissionDenied.is_permission_error());
        assert!(!MemoError::PermissionDenied.is_device_error());
        assert!(MemoError::DeviceError("mic gone".into()).is_device_error());
        assert!(MemoError::DeviceBusy.is_device_error());
        assert!(!MemoError::Timeout.is_device_error());
    }

    #[test]
    fn invalid_state_message_names_operation() {
        let err = MemoError::invalid_state("pause recording", "Idle");
        assert_eq!(
            err.to_string(),
            "invalid state: cannot pause recording while \"Idle\""
        );
    }
}
