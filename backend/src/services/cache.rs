//! Response cache
//!
//! Bounded, TTL-based memoization of reports keyed by rounded coordinates and
//! the snapshot's freshness marker. Expiry is lazy; overflow evicts the single
//! oldest-inserted entry (insertion order, not recency of use).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{Location, QualityGrade, Report};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Identity of a cached report
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat: Decimal,
    lng: Decimal,
    last_updated: DateTime<Utc>,
}

impl CacheKey {
    /// Round coordinates to `precision` decimal digits so nearby queries collapse
    pub fn new(location: &Location, last_updated: DateTime<Utc>, precision: u32) -> Self {
        let round = |v: f64| {
            Decimal::from_f64_retain(v)
                .unwrap_or_default()
                .round_dp(precision)
                .normalize()
        };
        Self {
            lat: round(location.lat),
            lng: round(location.lng),
            last_updated,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}@{}", self.lat, self.lng, self.last_updated.to_rfc3339())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    report: Report,
    inserted_at: Instant,
}

/// Map plus insertion order; both always hold the same key set
#[derive(Debug, Default)]
struct CacheTable {
    entries: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
}

impl CacheTable {
    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }
}

/// Process-wide report cache
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    table: Mutex<CacheTable>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            table: Mutex::new(CacheTable::default()),
        }
    }

    /// Fresh report for `key`; an expired entry is evicted and reported as a miss
    pub async fn get(&self, key: &CacheKey) -> Option<Report> {
        let mut table = self.table.lock().await;

        let expired = match table.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.report.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            table.remove(key);
            tracing::debug!("Cache entry {} expired", key);
        }
        None
    }

    /// Store a report; poor-quality or non-cacheable reports are refused
    pub async fn put(&self, key: CacheKey, report: Report) -> bool {
        if !report.metadata.cacheable || report.metadata.data_quality == QualityGrade::Poor {
            return false;
        }

        let mut table = self.table.lock().await;

        // Re-inserting a key makes it the newest entry
        table.remove(&key);
        table.order.push_back(key.clone());
        table.entries.insert(
            key,
            CacheEntry {
                report,
                inserted_at: Instant::now(),
            },
        );

        while table.entries.len() > self.max_entries {
            match table.order.pop_front() {
                Some(oldest) => {
                    table.entries.remove(&oldest);
                    tracing::debug!("Cache full, evicted oldest entry {}", oldest);
                }
                None => break,
            }
        }
        true
    }

    /// Whether a live entry exists, without evicting
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let table = self.table.lock().await;
        table
            .entries
            .get(key)
            .map(|e| e.inserted_at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// Entry count, including expired entries not yet evicted
    pub async fn len(&self) -> usize {
        self.table.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut table = self.table.lock().await;
        let ttl = self.ttl;
        let before = table.entries.len();

        table.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        let CacheTable { entries, order } = &mut *table;
        order.retain(|k| entries.contains_key(k));

        before - table.entries.len()
    }
}
