//! Mock fare source for testing without API access.
//!
//! Serves a fixed network of fares from memory. Can be loaded from the
//! `flight_info.json` dump format (origin → destination → departure →
//! `[price, arrival, currency]`) so a scraped snapshot can be searched offline.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::NaiveDate;

use crate::domain::{Airport, AirportCode, CurrencyCode, Fare, FlightKey, Price};

use super::convert::{convert_airports, parse_utc};
use super::error::FareError;
use super::source::FareSource;
use super::types::AirportDto;

/// Departure → (price, arrival, currency).
type DumpDepartures = HashMap<String, (f64, String, String)>;

/// Origin → destination → departures.
type FlightInfoDump = HashMap<String, HashMap<String, DumpDepartures>>;

/// Mock fare source that serves a fixed network from memory.
#[derive(Default)]
pub struct MockFareSource {
    airports: Vec<Airport>,
    fares: Vec<Fare>,
    /// Prices returned by `refresh`, overriding the listed fare.
    /// `None` marks a flight that has sold out since it was listed.
    refreshed: HashMap<FlightKey, Option<Price>>,
    /// Number of upcoming calls that fail with a transient error.
    failures: AtomicU32,
    /// When set, every call fails with a fatal error.
    fatal: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockFareSource {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `flight_info.json` dump.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FareError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| FareError::Unavailable(format!("failed to read {:?}: {}", path, e)))?;
        Self::from_json_str(&json)
    }

    /// Parse a `flight_info.json` dump.
    pub fn from_json_str(json: &str) -> Result<Self, FareError> {
        let dump: FlightInfoDump = serde_json::from_str(json).map_err(|e| FareError::Json {
            message: e.to_string(),
            body: None,
        })?;

        let mut source = Self::new();
        for (origin, destinations) in &dump {
            let origin = parse_airport(origin)?;
            for (destination, departures) in destinations {
                let destination = parse_airport(destination)?;
                for (departure, (amount, arrival, currency)) in departures {
                    let currency =
                        CurrencyCode::parse(currency).map_err(|_| FareError::Malformed {
                            field: "currency",
                            value: currency.clone(),
                        })?;
                    source.add_fare(Fare {
                        origin,
                        destination,
                        departure: parse_utc(departure)?,
                        arrival: parse_utc(arrival)?,
                        price: Price::new(*amount, currency),
                    });
                }
            }
        }

        Ok(source)
    }

    /// Add the airports of an autocomplete listing dump (the same JSON the
    /// live airports endpoint returns). Returns how many were added.
    pub fn load_airports_json(&mut self, json: &str) -> Result<usize, FareError> {
        let dtos: Vec<AirportDto> = serde_json::from_str(json).map_err(|e| FareError::Json {
            message: e.to_string(),
            body: None,
        })?;
        let airports = convert_airports(dtos);
        let added = airports.len();
        self.airports.extend(airports);
        Ok(added)
    }

    pub fn add_airport(&mut self, airport: Airport) {
        self.airports.push(airport);
    }

    pub fn add_fare(&mut self, fare: Fare) {
        self.fares.push(fare);
    }

    /// Make `refresh` report `price` for this flight (`None`: sold out).
    pub fn set_refreshed(&mut self, flight: FlightKey, price: Option<Price>) {
        self.refreshed.insert(flight, price);
    }

    /// Fail the next `n` calls with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Fail every call from now on with a fatal error.
    pub fn fail_fatally(&self) {
        self.fatal.store(true, Ordering::SeqCst);
    }

    /// How many times `operation` has been called.
    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn fare_count(&self) -> usize {
        self.fares.len()
    }

    fn enter(&self, operation: &'static str) -> Result<(), FareError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(operation).or_insert(0) += 1;
        }

        if self.fatal.load(Ordering::SeqCst) {
            return Err(FareError::Unauthorized);
        }

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FareError::Unavailable(format!(
                "scripted failure in {operation}"
            )));
        }

        Ok(())
    }
}

fn parse_airport(s: &str) -> Result<AirportCode, FareError> {
    AirportCode::parse(s).map_err(|_| FareError::Malformed {
        field: "airport",
        value: s.to_string(),
    })
}

impl FareSource for MockFareSource {
    async fn airports(&self) -> Result<Vec<Airport>, FareError> {
        self.enter("airports")?;
        Ok(self.airports.clone())
    }

    async fn destinations(&self, origin: AirportCode) -> Result<Vec<AirportCode>, FareError> {
        self.enter("destinations")?;
        let destinations: BTreeSet<AirportCode> = self
            .fares
            .iter()
            .filter(|f| f.origin == origin)
            .map(|f| f.destination)
            .collect();
        Ok(destinations.into_iter().collect())
    }

    async fn fares(
        &self,
        origin: AirportCode,
        destinations: &[AirportCode],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Fare>, FareError> {
        self.enter("fares")?;
        Ok(self
            .fares
            .iter()
            .filter(|f| f.origin == origin && destinations.contains(&f.destination))
            .filter(|f| {
                let day = f.departure.date_naive();
                day >= date_from && day <= date_to
            })
            .cloned()
            .collect())
    }

    async fn refresh(&self, flight: &FlightKey) -> Result<Option<Price>, FareError> {
        self.enter("refresh")?;
        if let Some(price) = self.refreshed.get(flight) {
            return Ok(*price);
        }
        Ok(self
            .fares
            .iter()
            .find(|f| f.key() == *flight)
            .map(|f| f.price))
    }
}
