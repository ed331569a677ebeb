use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::audio_models::{PreparedSource, SourceHandle};

/// Frees the device resource behind a prepared source.
pub type ReleaseCallback = Arc<dyn Fn(SourceHandle) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy)]
struct CachedSource {
    source: PreparedSource,
    last_accessed_order: u64,
}

/// Bounded LRU cache of prepared playback sources, keyed by file path.
///
/// Entries survive stop/start of playback so replaying a recent file skips
/// preparation. Every entry that leaves the cache (eviction, removal, clear,
/// drop) has its handle released through the release callback first.
///
/// Recency is a monotonic counter; `recency` indexes entries by it so the
/// least recently used key is always the first entry.
pub struct SourceCache {
    capacity: usize,
    entries: HashMap<PathBuf, CachedSource>,
    recency: BTreeMap<u64, PathBuf>,
    next_order: u64,
    release: ReleaseCallback,
}

impl SourceCache {
    pub fn new(capacity: usize, release: ReleaseCallback) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            next_order: 0,
            release,
        }
    }

    /// Look up a prepared source and mark it most recently used.
    pub fn get(&mut self, key: &Path) -> Option<PreparedSource> {
        let order = self.bump_order();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_accessed_order);
        entry.last_accessed_order = order;
        self.recency.insert(order, key.to_path_buf());
        Some(entry.source)
    }

    /// Insert a prepared source, evicting the least recently used entry when full.
    ///
    /// If `key` is already cached only its recency is refreshed; a different
    /// incoming handle is released since the cache keeps the existing one.
    pub fn put(&mut self, key: PathBuf, source: PreparedSource) {
        if let Some(existing) = self.get(&key) {
            if existing.handle != source.handle {
                log::debug!("source for {} already cached, releasing duplicate", key.display());
                (self.release)(source.handle);
            }
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }

        let order = self.bump_order();
        self.recency.insert(order, key.clone());
        self.entries.insert(
            key,
            CachedSource {
                source,
                last_accessed_order: order,
            },
        );
    }

    /// Drop one entry, e.g. after its file was deleted.
    pub fn remove(&mut self, key: &Path) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.recency.remove(&entry.last_accessed_order);
                (self.release)(entry.source.handle);
                true
            }
            None => false,
        }
    }

    /// Release every cached handle.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            (self.release)(entry.source.handle);
        }
        self.recency.clear();
    }

    /// Membership test that leaves recency untouched.
    pub fn contains(&self, key: &Path) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<PathBuf> {
        self.recency.values().cloned().collect()
    }

    fn bump_order(&mut self) -> u64 {
        self.next_order += 1;
        self.next_order
    }

    fn evict_least_recent(&mut self) {
        let Some((_, key)) = self.recency.pop_first() else {
            return;
        };
        if let Some(entry) = self.entries.remove(&key) {
            log::debug!("evicting cached source {}", key.display());
            (self.release)(entry.source.handle);
        }
    }
}

impl Drop for SourceCache {
    fn drop(&mut self) {
        self.clear();
    }
}
