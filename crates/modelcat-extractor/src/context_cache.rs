//! Tracks which prompt segments are still registered upstream

use crate::config::CacheConfig;
use modelcat_domain::{ContentHash, PromptSegment};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Registration status of a segment as seen by the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// Never sent, or evicted
    Unregistered,

    /// Sent within the reuse window
    Registered,

    /// Sent, but the reuse window has elapsed
    Expired,
}

/// Split of a request's segments into fresh and reusable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Segments that must be sent and registered
    pub fresh: Vec<ContentHash>,

    /// Segments still registered upstream
    pub registered: Vec<ContentHash>,
}

impl Resolution {
    /// Whether a hash resolved as registered
    pub fn is_registered(&self, hash: &ContentHash) -> bool {
        self.registered.contains(hash)
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Segments resolved as registered
    pub hits: u64,

    /// Segments resolved as fresh
    pub misses: u64,

    /// Entries dropped to stay within capacity
    pub evictions: u64,

    /// Entries currently tracked
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Inner {
    last_used: HashMap<ContentHash, Instant>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// In-process view of the upstream prompt cache
///
/// Purely an optimisation: a wrong answer costs tokens, never correctness,
/// because a segment marked for reuse is still sent in full. The cache is
/// empty after a restart.
#[derive(Debug)]
pub struct ReusableContextCache {
    reuse_window: Duration,
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ReusableContextCache {
    /// Create a cache with the given settings
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            reuse_window: config.reuse_window(),
            capacity: config.capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Reuse window
    pub fn reuse_window(&self) -> Duration {
        self.reuse_window
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters and timestamps stay usable after a panicking holder
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve segments against the cache now
    pub fn resolve(&self, segments: &[PromptSegment]) -> Resolution {
        self.resolve_at(segments, Instant::now())
    }

    /// Resolve segments against the cache at `now`
    pub fn resolve_at(&self, segments: &[PromptSegment], now: Instant) -> Resolution {
        let mut inner = self.lock();
        let mut resolution = Resolution::default();

        for segment in segments {
            let hash = segment.hash();
            let live = inner
                .last_used
                .get(hash)
                .is_some_and(|used| now.saturating_duration_since(*used) < self.reuse_window);
            if live {
                inner.hits += 1;
                resolution.registered.push(hash.clone());
            } else {
                inner.misses += 1;
                resolution.fresh.push(hash.clone());
            }
        }

        debug!(
            "Context cache: {} registered, {} fresh",
            resolution.registered.len(),
            resolution.fresh.len()
        );
        resolution
    }

    /// Status of a single segment at `now`
    pub fn status_at(&self, hash: &ContentHash, now: Instant) -> SegmentStatus {
        match self.lock().last_used.get(hash) {
            None => SegmentStatus::Unregistered,
            Some(used) if now.saturating_duration_since(*used) < self.reuse_window => {
                SegmentStatus::Registered
            }
            Some(_) => SegmentStatus::Expired,
        }
    }

    /// Record that segments were used by a successful call now
    pub fn mark_used(&self, segments: &[PromptSegment]) {
        self.mark_used_at(segments, Instant::now());
    }

    /// Record that segments were used by a successful call at `now`
    pub fn mark_used_at(&self, segments: &[PromptSegment], now: Instant) {
        let mut inner = self.lock();
        for segment in segments {
            inner.last_used.insert(segment.hash().clone(), now);
        }

        if inner.last_used.len() > self.capacity {
            let window = self.reuse_window;
            let before = inner.last_used.len();
            inner
                .last_used
                .retain(|_, used| now.saturating_duration_since(*used) < window);
            let dropped = (before - inner.last_used.len()) as u64;
            inner.evictions += dropped;
        }

        while inner.last_used.len() > self.capacity {
            let oldest = inner
                .last_used
                .iter()
                .min_by_key(|(_, used)| **used)
                .map(|(hash, _)| hash.clone());
            match oldest {
                Some(hash) => {
                    inner.last_used.remove(&hash);
                    inner.evictions += 1;
                }
                None => break,
            }
        }
    }

    /// Forget every entry (counters are kept)
    pub fn clear(&self) {
        self.lock().last_used.clear();
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entries: inner.last_used.len(),
        }
    }
}

impl Default for ReusableContextCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
