//! Caching layer for fare source responses.
//!
//! Every fare source operation is a pure function of its arguments for the
//! duration of a search run, so results are memoized per argument tuple.
//! Concurrent lookups of the same key share a single fetch. The cache is
//! cleared at the end of each run; nothing persists across runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache as MokaCache;

use crate::domain::{Airport, AirportCode, Fare, FlightKey, Price};
use crate::fares::{FareError, FareSource};

/// Cache key for fare queries: (origin, destinations, date from, date to).
type FaresKey = (AirportCode, Vec<AirportCode>, NaiveDate, NaiveDate);

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries per operation.
    pub max_capacity: u64,

    /// Optional TTL for cached entries. `None` keeps entries for the whole run.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
            ttl: None,
        }
    }
}

fn build<K, V>(config: &CacheConfig) -> MokaCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let builder = MokaCache::builder().max_capacity(config.max_capacity);
    match config.ttl {
        Some(ttl) => builder.time_to_live(ttl).build(),
        None => builder.build(),
    }
}

/// Fare source with memoization.
///
/// Wraps any `FareSource` and caches every response, including "sold out"
/// answers from `refresh`. Errors are not cached.
pub struct CachedFareSource<S> {
    inner: S,
    airports: MokaCache<(), Arc<Vec<Airport>>>,
    destinations: MokaCache<AirportCode, Arc<Vec<AirportCode>>>,
    fares: MokaCache<FaresKey, Arc<Vec<Fare>>>,
    refreshed: MokaCache<FlightKey, Option<Price>>,
}

impl<S: FareSource> CachedFareSource<S> {
    /// Create a new cached source.
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        Self {
            inner,
            airports: build(config),
            destinations: build(config),
            fares: build(config),
            refreshed: build(config),
        }
    }

    /// Access the underlying source for operations that bypass cache.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached fare queries (for monitoring).
    pub fn fares_entry_count(&self) -> u64 {
        self.fares.entry_count()
    }
}

impl<S: FareSource> FareSource for CachedFareSource<S> {
    async fn airports(&self) -> Result<Vec<Airport>, FareError> {
        let entry = self
            .airports
            .try_get_with((), async { self.inner.airports().await.map(Arc::new) })
            .await
            .map_err(FareError::Shared)?;
        Ok(entry.as_ref().clone())
    }

    async fn destinations(&self, origin: AirportCode) -> Result<Vec<AirportCode>, FareError> {
        let entry = self
            .destinations
            .try_get_with(origin, async {
                self.inner.destinations(origin).await.map(Arc::new)
            })
            .await
            .map_err(FareError::Shared)?;
        Ok(entry.as_ref().clone())
    }

    async fn fares(
        &self,
        origin: AirportCode,
        destinations: &[AirportCode],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError> {
        let key = (origin, destinations.to_vec(), date_from, date_to);
        let entry = self
            .fares
            .try_get_with(key, async {
                self.inner
                    .fares(origin, destinations, date_from, date_to)
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(FareError::Shared)?;
        Ok(entry.as_ref().clone())
    }

    async fn refresh(&self, flight: &FlightKey) -> Result<Option<Price>, FareError> {
        self.refreshed
            .try_get_with(*flight, self.inner.refresh(flight))
            .await
            .map_err(FareError::Shared)
    }

    fn clear(&self) {
        self.airports.invalidate_all();
        self.destinations.invalidate_all();
        self.fares.invalidate_all();
        self.refreshed.invalidate_all();
        self.inner.clear();
    }
}
