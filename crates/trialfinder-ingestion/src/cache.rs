//! In-process TTL cache for normalised search results.
//!
//! Entries are keyed by [`QueryParams::cache_key`] and expire lazily on
//! lookup. Each key has its own async lock held across the fetch, so
//! concurrent misses on one key trigger a single registry fetch. Expired
//! and failed slots that nobody is using are dropped from the map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use trialfinder_common::Result;

use crate::models::{CacheKey, QueryParams, SkipDiagnostics, TrialRecord};

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Time source for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Ok(delta) = chrono::Duration::from_std(by) {
            *now += delta;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Cache ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 { 3_600 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: default_ttl_secs() }
    }
}

/// One cached result set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: Vec<TrialRecord>,
    /// Diagnostics from the normalisation that produced `records`.
    pub diagnostics: SkipDiagnostics,
    pub fetched_at: DateTime<Utc>,
}

/// What [`TrialCache::get_or_fetch`] hands back.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub records: Vec<TrialRecord>,
    pub diagnostics: SkipDiagnostics,
    pub from_cache: bool,
    pub fetched_at: DateTime<Utc>,
}

type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

pub struct TrialCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl TrialCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock, slots: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), Arc::new(SystemClock))
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let age = (self.clock.now() - entry.fetched_at).to_std().unwrap_or_default();
        age < self.ttl
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        self.prune(&mut slots);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop idle slots whose entry is missing or expired. Slots are only
    /// handed out under the map lock, so a slot referenced outside the map
    /// belongs to an in-flight lookup and is kept.
    fn prune(&self, slots: &mut HashMap<CacheKey, Slot>) {
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .map_or(true, |entry| entry.as_ref().is_some_and(|e| self.is_fresh(e)))
        });
        let pruned = before - slots.len();
        if pruned > 0 {
            debug!(pruned, "Pruned idle cache slots");
        }
    }

    /// Forget a slot whose fetch failed, unless other lookups hold it.
    fn release_failed(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let ours = slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot));
        // One reference lives in the map, one in the caller.
        if ours && Arc::strong_count(slot) <= 2 {
            slots.remove(key);
        }
    }

    /// Serve a fresh entry for `query`, or run `fetch` and store its result.
    /// Errors from `fetch` are returned as-is and never cached.
    pub async fn get_or_fetch<F, Fut>(&self, query: &QueryParams, fetch: F) -> Result<CachedResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(Vec<TrialRecord>, SkipDiagnostics)>>,
    {
        let key = query.cache_key();
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if self.is_fresh(entry) {
                debug!(key = %key, "Cache hit");
                return Ok(CachedResult {
                    records: entry.records.clone(),
                    diagnostics: entry.diagnostics.clone(),
                    from_cache: true,
                    fetched_at: entry.fetched_at,
                });
            }
            debug!(key = %key, "Cache entry stale");
        }

        let (records, diagnostics) = match fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                if guard.is_none() {
                    self.release_failed(&key, &slot);
                }
                return Err(e);
            }
        };
        let fetched_at = self.clock.now();
        *guard = Some(CacheEntry {
            records: records.clone(),
            diagnostics: diagnostics.clone(),
            fetched_at,
        });
        Ok(CachedResult { records, diagnostics, from_cache: false, fetched_at })
    }

    /// Drop one entry, or every entry when `query` is `None`.
    /// Returns how many keys were removed.
    pub fn invalidate(&self, query: Option<&QueryParams>) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match query {
            Some(q) => usize::from(slots.remove(&q.cache_key()).is_some()),
            None => {
                let n = slots.len();
                slots.clear();
                n
            }
        }
    }

    /// Number of keys currently tracked, stale ones included.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TrialCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
