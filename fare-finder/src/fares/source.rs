//! The fare source contract and its retrying wrapper.

use chrono::NaiveDate;
use futures::future::try_join_all;

use crate::domain::{Airport, AirportCode, Fare, FlightKey, Price};
use crate::retry::RetryPolicy;

use super::error::FareError;

/// Access to airports, routes and fares.
///
/// Every operation is a pure function of its arguments for the duration of a
/// run, so callers may memoize freely. This abstraction allows the finder to
/// be tested with an in-memory network.
#[allow(async_fn_in_trait)]
pub trait FareSource {
    /// All airports the source serves.
    async fn airports(&self) -> Result<Vec<Airport>, FareError>;

    /// Airports reachable from `origin` by a direct flight.
    async fn destinations(&self, origin: AirportCode) -> Result<Vec<AirportCode>, FareError>;

    /// Every fare with seats left from `origin` to one of `destinations`,
    /// departing on a date in `[date_from, date_to]`.
    async fn fares(
        &self,
        origin: AirportCode,
        destinations: &[AirportCode],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError>;

    /// Current price of a previously seen flight, or `None` if it can no
    /// longer be booked.
    async fn refresh(&self, flight: &FlightKey) -> Result<Option<Price>, FareError>;

    /// Every fare out of several origins, queried concurrently. Used to treat
    /// a multi-airport city as one node.
    ///
    /// Each origin's routes come from [`FareSource::destinations`] on `self`,
    /// so a memoizing source answers them from its cache.
    async fn fares_for_origins(
        &self,
        origins: &[AirportCode],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError> {
        let batches = try_join_all(origins.iter().map(|origin| async move {
            let destinations = self.destinations(*origin).await?;
            self.fares(*origin, &destinations, date_from, date_to).await
        }))
        .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Drop anything memoized for the current run.
    fn clear(&self) {}
}

/// Fare source wrapper that retries each call under a [`RetryPolicy`].
pub struct RetryingFareSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: FareSource> RetryingFareSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<S: FareSource> FareSource for RetryingFareSource<S> {
    async fn airports(&self) -> Result<Vec<Airport>, FareError> {
        self.policy
            .run("airports", || self.inner.airports())
            .await
    }

    async fn destinations(&self, origin: AirportCode) -> Result<Vec<AirportCode>, FareError> {
        let operation = format!("destinations {origin}");
        self.policy
            .run(&operation, || self.inner.destinations(origin))
            .await
    }

    async fn fares(
        &self,
        origin: AirportCode,
        destinations: &[AirportCode],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError> {
        let operation = format!(
            "fares {origin} to {} airports {date_from}..{date_to}",
            destinations.len()
        );
        self.policy
            .run(&operation, || {
                self.inner.fares(origin, destinations, date_from, date_to)
            })
            .await
    }

    async fn refresh(&self, flight: &FlightKey) -> Result<Option<Price>, FareError> {
        let operation = format!(
            "refresh {}->{} {}",
            flight.origin, flight.destination, flight.departure
        );
        self.policy
            .run(&operation, || self.inner.refresh(flight))
            .await
    }

    fn clear(&self) {
        self.inner.clear();
    }
}
