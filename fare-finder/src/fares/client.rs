//! Ryanair public API client.
//!
//! Provides async methods for listing airports, direct routes and per-day
//! fare availability. Bounds in-flight requests with a semaphore so that a
//! concurrent search does not trip the source's rate limits.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::domain::{Airport, AirportCode, Fare, FlightKey, Price};

use super::convert::{convert_airports, convert_availability, convert_routes};
use super::error::FareError;
use super::source::FareSource;
use super::types::{AirportDto, AvailabilityDto, RouteDto};

/// Default base URL for the Ryanair API.
const DEFAULT_BASE_URL: &str = "https://www.ryanair.com/api";

/// Default market (language and country) for requests.
const DEFAULT_MARKET: &str = "en-gb";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// The availability endpoint covers at most this many days after `DateOut`.
const MAX_FLEX_DAYS: i64 = 6;

/// Configuration for the fare client.
#[derive(Debug, Clone)]
pub struct FareClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Market code, e.g. `en-gb`
    pub market: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FareClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for FareClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            market: DEFAULT_MARKET.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }
}

/// Ryanair API client.
#[derive(Debug, Clone)]
pub struct FareClient {
    http: reqwest::Client,
    base_url: String,
    market: String,
    semaphore: Arc<Semaphore>,
}

impl FareClient {
    /// Create a new client with the given configuration.
    pub fn new(config: FareClientConfig) -> Result<Self, FareError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            market: config.market,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// GET `url` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FareError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FareError::Unavailable("semaphore closed".to_string()))?;

        trace!(url, "Fare source request");
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FareError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FareError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FareError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| FareError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }

    /// Availability for one route, `flex_days` days on from `date_out`.
    async fn availability(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        date_out: NaiveDate,
        flex_days: i64,
    ) -> Result<Vec<Fare>, FareError> {
        let url = format!("{}/booking/v4/{}/availability", self.base_url, self.market);
        let query = [
            ("ADT", "1".to_string()),
            ("CHD", "0".to_string()),
            ("INF", "0".to_string()),
            ("TEEN", "0".to_string()),
            ("Disc", "0".to_string()),
            ("DateIn", String::new()),
            ("DateOut", date_out.format("%Y-%m-%d").to_string()),
            ("Origin", origin.to_string()),
            ("Destination", destination.to_string()),
            ("promoCode", String::new()),
            ("IncludeConnectingFlights", "false".to_string()),
            ("FlexDaysBeforeOut", "0".to_string()),
            ("FlexDaysOut", flex_days.to_string()),
            ("ToUs", "AGREED".to_string()),
        ];

        let dto: AvailabilityDto = self.get_json(&url, &query).await?;
        convert_availability(&dto, origin, destination)
    }

    /// Fares on one route for every day in `[date_from, date_to]`.
    async fn route_fares(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError> {
        let mut fares = Vec::new();
        let mut start = date_from;

        while start <= date_to {
            let flex = (date_to - start).num_days().min(MAX_FLEX_DAYS);
            fares.extend(self.availability(origin, destination, start, flex).await?);
            start += Duration::days(flex + 1);
        }

        fares.retain(|f| {
            let day = f.departure.date_naive();
            day >= date_from && day <= date_to
        });
        Ok(fares)
    }
}

impl FareSource for FareClient {
    async fn airports(&self) -> Result<Vec<Airport>, FareError> {
        let url = format!("{}/locate/v1/autocomplete/airports", self.base_url);
        let query = [("phrase", String::new()), ("market", self.market.clone())];

        let dtos: Vec<AirportDto> = self.get_json(&url, &query).await?;
        Ok(convert_airports(dtos))
    }

    async fn destinations(&self, origin: AirportCode) -> Result<Vec<AirportCode>, FareError> {
        let url = format!("{}/locate/v1/autocomplete/routes", self.base_url);
        let query = [
            ("arrivalPhrase", String::new()),
            ("departurePhrase", origin.to_string()),
            ("market", self.market.clone()),
        ];

        let dtos: Vec<RouteDto> = self.get_json(&url, &query).await?;
        Ok(convert_routes(dtos))
    }

    async fn fares(
        &self,
        origin: AirportCode,
        destinations: &[AirportCode],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError> {
        if date_from > date_to {
            return Ok(Vec::new());
        }

        let per_route = try_join_all(
            destinations
                .iter()
                .map(|dest| self.route_fares(origin, *dest, date_from, date_to)),
        )
        .await?;

        let fares: Vec<Fare> = per_route.into_iter().flatten().collect();
        debug!(
            origin = %origin,
            routes = destinations.len(),
            fares = fares.len(),
            %date_from,
            %date_to,
            "Fetched fares"
        );
        Ok(fares)
    }

    async fn refresh(&self, flight: &FlightKey) -> Result<Option<Price>, FareError> {
        let fares = self
            .availability(
                flight.origin,
                flight.destination,
                flight.departure.date_naive(),
                0,
            )
            .await?;

        Ok(fares
            .into_iter()
            .find(|f| f.departure == flight.departure)
            .map(|f| f.price))
    }
}
