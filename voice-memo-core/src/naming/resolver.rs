use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::models::error::MemoError;
use crate::traits::clock::Clock;
use crate::traits::location_provider::LocationProvider;

/// Derives display names for finished recordings.
///
/// The base name comes from reverse geocoding, falling back to a timestamp
/// when the lookup fails, times out, or returns nothing. Collisions within a
/// folder are resolved with an incrementing ` <N>` suffix.
pub struct NamingResolver {
    location: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl NamingResolver {
    pub fn new(location: Arc<dyn LocationProvider>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            location,
            clock,
            timeout,
        }
    }

    /// Base name plus collision suffix against `existing` names in the target folder.
    pub fn resolve(&self, existing: &[String]) -> String {
        let base = self.base_name();
        unique_name(&base, existing)
    }

    /// Location name, or the timestamp fallback. Never waits longer than the timeout.
    pub fn base_name(&self) -> String {
        match self.lookup_location() {
            Ok(name) => name,
            Err(e) => {
                log::warn!("location lookup failed, using timestamp name: {}", e);
                fallback_name(self.clock.now())
            }
        }
    }

    fn lookup_location(&self) -> Result<String, MemoError> {
        let (tx, rx) = mpsc::channel();
        let location = Arc::clone(&self.location);
        let timeout = self.timeout;

        // The worker is detached; if it outlives the timeout its answer is dropped.
        thread::Builder::new()
            .name("geocode-lookup".into())
            .spawn(move || {
                let _ = tx.send(location.current_location_name(timeout));
            })
            .map_err(|e| MemoError::Unexpected(format!("failed to spawn geocode thread: {}", e)))?;

        let name = match rx.recv_timeout(timeout) {
            Ok(result) => result?,
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(MemoError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(MemoError::Unexpected("geocode worker exited without answer".into()))
            }
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(MemoError::Unexpected("empty location name".into()));
        }
        Ok(name.to_string())
    }
}

/// Timestamp-derived name used when no location is available.
pub fn fallback_name(now: DateTime<Utc>) -> String {
    format!("Recording {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Return `base`, or `"<base> <max+1>"` when `base` or a numbered variant is taken.
///
/// An exact `base` counts as suffix 1. Matching is anchored and the base is
/// escaped, so names containing regex metacharacters compare literally. A
/// base that itself ends in a number (`"Room 12"`) is treated as an opaque
/// string: only a suffix after one more space is parsed.
pub fn unique_name(base: &str, existing: &[String]) -> String {
    let pattern = format!(r"^{}(?: (\d+))?$", regex::escape(base));
    let matcher = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::error!("failed to build name pattern for {:?}: {}", base, e);
            return base.to_string();
        }
    };

    let highest = existing
        .iter()
        .filter_map(|name| {
            let caps = matcher.captures(name)?;
            match caps.get(1) {
                Some(n) => n.as_str().parse::<u64>().ok(),
                None => Some(1),
            }
        })
        .max();

    match highest {
        Some(n) => format!("{} {}", base, n.saturating_add(1)),
        None => base.to_string(),
    }
}
