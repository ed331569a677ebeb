use std::time::Duration;

use crate::models::error::MemoError;

/// Reverse-geocoding source for recording names.
pub trait LocationProvider: Send + Sync {
    /// A human-readable name for the device's current location.
    ///
    /// Implementations should give up after `timeout`; the naming resolver
    /// enforces the same bound regardless.
    fn current_location_name(&self, timeout: Duration) -> Result<String, MemoError>;
}
