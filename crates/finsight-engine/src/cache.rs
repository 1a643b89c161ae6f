//! Period-aligned caching for the trend-interpretation stage
//!
//! Trend interpretations change when a new filing lands, not with wall-clock
//! time, so entries are keyed by `(company code, latest observed reporting
//! period)` and a hit requires the stored period to exactly equal the period
//! computed from the freshly fetched dataset. The store-level TTL is a coarse
//! backstop against abandoned tickers, never the primary invalidation signal.
//!
//! Every store operation is best-effort: a failed read or write is logged and
//! swallowed, and the stage recomputes or simply skips caching.

use async_trait::async_trait;
use cached::{Cached, TimedCache};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Coarse backstop expiry for trend entries (~one quarter)
pub const TREND_CACHE_BACKSTOP_TTL: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Error from an underlying cache store
#[derive(Debug, Error)]
#[error("cache store error: {0}")]
pub struct CacheError(pub String);

/// Trait for cache store backends
///
/// Both operations may fail; callers treat failures as misses and carry on.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` with a time-to-live
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// In-memory cache store backed by a timed cache
pub struct MemoryCacheStore {
    entries: Arc<RwLock<TimedCache<String, String>>>,
}

impl MemoryCacheStore {
    /// Create a store whose entries default to the trend backstop TTL
    pub fn new() -> Self {
        Self::with_lifespan(TREND_CACHE_BACKSTOP_TTL)
    }

    /// Create a store with a specific entry lifespan
    pub fn with_lifespan(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryCacheStore {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.write().await;
        Ok(entries.cache_get(&key.to_string()).cloned())
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.cache_set_lifespan(ttl);
        let _ = entries.cache_set(key.to_string(), value);
        Ok(())
    }
}

/// Cached trend interpretations for one company and reporting period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendCacheEntry {
    pub company_code: String,
    pub company_name: String,
    pub industry: String,
    /// Fiscal end date the interpretations were computed for
    pub latest_period: String,
    pub interpretations: Map<String, Value>,
    pub generated_at: DateTime<Utc>,
    /// First day of the next fiscal quarter after generation
    pub expires_at: DateTime<Utc>,
}

/// Period-keyed cache for trend interpretations
pub struct TrendCache {
    store: Arc<dyn CacheStore>,
}

impl TrendCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn key(company_code: &str, latest_period: &str) -> String {
        format!("trend_interpretation:{company_code}:{latest_period}")
    }

    /// Look up interpretations for the current run's freshly computed period
    ///
    /// Returns `None` on a miss, a stale-period entry, a decode failure, or a
    /// store failure; the last two are logged.
    pub async fn load(
        &self,
        company_code: &str,
        latest_period: &str,
    ) -> Option<Map<String, Value>> {
        let key = Self::key(company_code, latest_period);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(%key, error = %err, "trend cache read failed");
                return None;
            }
        };

        let entry: TrendCacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%key, error = %err, "trend cache entry did not decode");
                return None;
            }
        };

        // The stored period must match the run's own computation exactly; an
        // entry from a prior period is never served even inside its TTL.
        if entry.latest_period != latest_period {
            debug!(%key, stored = %entry.latest_period, "trend cache entry is for a different period");
            return None;
        }

        info!(company = %company_code, period = %latest_period, "trend cache hit");
        Some(entry.interpretations)
    }

    /// Store interpretations computed by a successful stage run
    ///
    /// Failures are logged and swallowed; caching never fails the stage.
    pub async fn store(&self, entry: &TrendCacheEntry) {
        let key = Self::key(&entry.company_code, &entry.latest_period);
        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%key, error = %err, "trend cache entry did not encode");
                return;
            }
        };

        match self.store.put(&key, raw, TREND_CACHE_BACKSTOP_TTL).await {
            Ok(()) => info!(company = %entry.company_code, period = %entry.latest_period, "trend cache updated"),
            Err(err) => warn!(%key, error = %err, "trend cache write failed"),
        }
    }
}

/// First day of the fiscal quarter following `now`
pub fn next_quarter_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = match now.month() {
        1..=3 => (now.year(), 4),
        4..=6 => (now.year(), 7),
        7..=9 => (now.year(), 10),
        _ => (now.year() + 1, 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(now, |naive| naive.and_utc())
}
