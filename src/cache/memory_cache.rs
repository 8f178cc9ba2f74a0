use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CachedPage, PageCache};
use crate::error::Result;

/// Entry count at which `put` first sweeps expired pages.
const SWEEP_THRESHOLD: usize = 1024;

/// Process-local page cache with per-entry expiry.
///
/// Expired entries go away on read, and in bulk whenever an insert pushes
/// the map past the sweep limit. The limit doubles with the live set.
pub struct MemoryPageCache {
    entries: DashMap<String, (Instant, CachedPage)>,
    sweep_at: AtomicUsize,
    min_sweep_at: usize,
}

impl Default for MemoryPageCache {
    fn default() -> Self {
        Self::with_sweep_threshold(SWEEP_THRESHOLD)
    }
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            entries: DashMap::new(),
            sweep_at: AtomicUsize::new(threshold),
            min_sweep_at: threshold,
        }
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        let live = self.entries.len();
        self.sweep_at
            .store((live * 2).max(self.min_sweep_at), Ordering::Relaxed);
        debug!(removed = before - live, live, "page cache SWEEP");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (expires_at, page) = entry.value();
            if *expires_at > now {
                return Ok(Some(page.clone()));
            }
        }

        // Expired entries are dropped lazily on read
        self.entries.remove_if(key, |_, (expires_at, _)| *expires_at <= now);
        Ok(None)
    }

    async fn put(&self, key: &str, page: &CachedPage, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + ttl;
        if self.entries.len() >= self.sweep_at.load(Ordering::Relaxed) {
            self.sweep_expired();
        }
        self.entries
            .insert(key.to_string(), (expires_at, page.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.entries.len();
        self.entries.clear();
        debug!(removed, "page cache CLEAR");
        Ok(())
    }
}
