//! Bounded in-process report cache with TTL expiry.
//!
//! Read-through cache in front of the two backing stores, keyed by report
//! id. Entries expire after a fixed TTL and are evicted lazily on access;
//! there is no background sweep. When the cache is full the single
//! oldest-inserted entry is evicted: first-in-first-out by insertion
//! order, not least-recently-used. A hot report re-fetched many times is
//! evicted no later than a cold one inserted at the same time, and
//! replacing an entry keeps its original insertion position.

use reportvault_core::{CacheConfig, ComplianceReport, ReportId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// A cached report with its insertion instant.
struct CacheEntry {
    report: ComplianceReport,
    cached_at: Instant,
}

/// Map plus insertion queue, guarded together so eviction order can never
/// drift from the map contents.
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    insertion_order: VecDeque<String>,
}

/// Bounded FIFO report cache with per-entry TTL.
pub struct ReportCache {
    inner: RwLock<CacheInner>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReportCache {
    /// Create a cache from its configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::with_capacity(config.capacity),
                insertion_order: VecDeque::with_capacity(config.capacity),
            }),
            capacity: config.capacity.max(1),
            ttl: config.ttl(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a report. Returns `None` on absence or staleness; a stale
    /// entry is removed on the way out.
    ///
    /// Takes the write guard unconditionally: a get may have to evict.
    pub async fn get(&self, id: &ReportId) -> Option<ComplianceReport> {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.entries.get(id.as_str()) {
            if entry.cached_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.report.clone());
            }
            inner.entries.remove(id.as_str());
            let key = id.as_str().to_string();
            inner.insertion_order.retain(|k| *k != key);
            debug!(report_id = %id, "evicted stale cache entry");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace an entry. Replacement keeps the original insertion
    /// position; inserting beyond capacity evicts the oldest-inserted entry.
    pub async fn put(&self, id: &ReportId, report: ComplianceReport) {
        let mut inner = self.inner.write().await;
        let key = id.as_str().to_string();
        let replaced = inner
            .entries
            .insert(
                key.clone(),
                CacheEntry {
                    report,
                    cached_at: Instant::now(),
                },
            )
            .is_some();
        if !replaced {
            inner.insertion_order.push_back(key);
        }
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.insertion_order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            debug!(report_id = %oldest, "evicted oldest-inserted cache entry");
        }
    }

    /// Remove an entry if present.
    pub async fn invalidate(&self, id: &ReportId) {
        let mut inner = self.inner.write().await;
        if inner.entries.remove(id.as_str()).is_some() {
            let key = id.as_str().to_string();
            inner.insertion_order.retain(|k| *k != key);
        }
    }

    /// Current number of entries (stale entries included until touched).
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Misses since creation.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
