mod client;

pub use client::HolidayApiClient;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::http::FetchError;
use crate::observability;

pub const DEFAULT_SUCCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_FAILURE_TTL: Duration = Duration::from_secs(60 * 60);

pub type HolidaySet = Arc<HashSet<NaiveDate>>;

/// External public-holiday lookup for a country and year.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// An unconfigured source is never called.
    fn is_configured(&self) -> bool {
        true
    }

    async fn lookup(&self, country: &str, year: i32) -> Result<HashSet<NaiveDate>, FetchError>;
}

struct Unconfigured;

#[async_trait]
impl HolidaySource for Unconfigured {
    fn is_configured(&self) -> bool {
        false
    }

    async fn lookup(&self, _country: &str, _year: i32) -> Result<HashSet<NaiveDate>, FetchError> {
        Ok(HashSet::new())
    }
}

#[derive(Clone)]
struct CacheEntry {
    holidays: HolidaySet,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// TTL cache in front of a [`HolidaySource`].
///
/// Successful lookups live for `success_ttl`. A failed lookup is cached as an
/// empty set for the shorter `failure_ttl`, so a broken source is retried
/// periodically instead of on every query.
pub struct HolidayCache {
    source: Arc<dyn HolidaySource>,
    entries: DashMap<String, CacheEntry>,
    success_ttl: Duration,
    failure_ttl: Duration,
}

impl HolidayCache {
    pub fn new(source: Arc<dyn HolidaySource>, success_ttl: Duration, failure_ttl: Duration) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            success_ttl,
            failure_ttl,
        }
    }

    pub fn with_default_ttls(source: Arc<dyn HolidaySource>) -> Self {
        Self::new(source, DEFAULT_SUCCESS_TTL, DEFAULT_FAILURE_TTL)
    }

    /// A cache whose source is never configured: every lookup is empty.
    pub fn disabled() -> Self {
        Self::with_default_ttls(Arc::new(Unconfigured))
    }

    pub async fn get(&self, country: &str, year: i32) -> HolidaySet {
        if country.trim().is_empty() || !self.source.is_configured() {
            metrics::counter!(observability::HOLIDAY_LOOKUPS_TOTAL, "result" => "skipped").increment(1);
            return HolidaySet::default();
        }

        let key = cache_key(country, year);
        // Clone out so no map guard is held across the await below.
        let cached = self.entries.get(&key).map(|e| e.value().clone());
        if let Some(entry) = cached
            && !entry.is_expired(Instant::now())
        {
            debug!("holidays cache hit for {key}");
            metrics::counter!(observability::HOLIDAY_LOOKUPS_TOTAL, "result" => "hit").increment(1);
            return entry.holidays;
        }

        match self.source.lookup(country, year).await {
            Ok(holidays) => {
                metrics::counter!(observability::HOLIDAY_LOOKUPS_TOTAL, "result" => "miss").increment(1);
                let holidays = Arc::new(holidays);
                self.store(key, holidays.clone(), self.success_ttl);
                holidays
            }
            Err(e) => {
                warn!("holiday lookup failed for {country}/{year}: {e}");
                metrics::counter!(observability::HOLIDAY_LOOKUPS_TOTAL, "result" => "failure").increment(1);
                let empty = HolidaySet::default();
                self.store(key, empty.clone(), self.failure_ttl);
                empty
            }
        }
    }

    fn store(&self, key: String, holidays: HolidaySet, ttl: Duration) {
        let entry = CacheEntry {
            holidays,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(country: &str, year: i32) -> String {
    format!("{country}|{year}").to_uppercase()
}
