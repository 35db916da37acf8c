//! Flight types.
//!
//! A `Fare` is one raw observation from the fare source. A `Flight` is a
//! fare whose price has been normalized into the base currency, which is
//! what the search compares.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use super::{AirportCode, DomainError, Price};

/// Identity of a bookable flight: two observations with the same origin,
/// destination and departure instant are the same flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlightKey {
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub departure: DateTime<Utc>,
}

/// A fare with available inventory, as reported by the fare source.
#[derive(Debug, Clone, PartialEq)]
pub struct Fare {
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub price: Price,
}

impl Fare {
    pub fn key(&self) -> FlightKey {
        FlightKey {
            origin: self.origin,
            destination: self.destination,
            departure: self.departure,
        }
    }
}

/// A direct flight leg with its cost in the base currency.
///
/// Equality and hashing are by [`FlightKey`], so the same flight observed
/// twice (possibly at different prices) collapses in sets and maps.
///
/// # Invariants
///
/// - Origin and destination differ
/// - Arrival is strictly after departure
/// - Amount and rate are finite and positive
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use fare_finder::domain::{AirportCode, CurrencyCode, Fare, Flight, Price};
///
/// let fare = Fare {
///     origin: AirportCode::parse("STN").unwrap(),
///     destination: AirportCode::parse("DUB").unwrap(),
///     departure: Utc.with_ymd_and_hms(2024, 3, 15, 6, 0, 0).unwrap(),
///     arrival: Utc.with_ymd_and_hms(2024, 3, 15, 7, 15, 0).unwrap(),
///     price: Price::new(30.0, CurrencyCode::parse("GBP").unwrap()),
/// };
///
/// // 0.5 GBP per EUR
/// let flight = Flight::new(fare, 0.5).unwrap();
/// assert_eq!(flight.normalized_cost(), 60.0);
/// ```
#[derive(Debug, Clone)]
pub struct Flight {
    fare: Fare,
    cost: f64,
}

impl Flight {
    /// Construct a flight from a fare and the exchange rate of its currency
    /// (units of that currency per one unit of base currency).
    pub fn new(fare: Fare, rate: f64) -> Result<Self, DomainError> {
        if fare.origin == fare.destination {
            return Err(DomainError::SelfLoop(fare.origin));
        }
        if fare.arrival <= fare.departure {
            return Err(DomainError::ArrivesBeforeDeparture {
                origin: fare.origin,
                destination: fare.destination,
            });
        }
        if !fare.price.amount.is_finite() || fare.price.amount <= 0.0 {
            return Err(DomainError::InvalidAmount(fare.price.amount));
        }
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DomainError::InvalidRate(rate));
        }

        let cost = fare.price.amount / rate;
        Ok(Self { fare, cost })
    }

    /// The same flight at an updated price.
    pub fn repriced(&self, price: Price, rate: f64) -> Result<Self, DomainError> {
        let fare = Fare {
            price,
            ..self.fare.clone()
        };
        Self::new(fare, rate)
    }

    pub fn key(&self) -> FlightKey {
        self.fare.key()
    }

    pub fn origin(&self) -> AirportCode {
        self.fare.origin
    }

    pub fn destination(&self) -> AirportCode {
        self.fare.destination
    }

    pub fn departure(&self) -> DateTime<Utc> {
        self.fare.departure
    }

    pub fn arrival(&self) -> DateTime<Utc> {
        self.fare.arrival
    }

    /// The price as quoted, in the fare's own currency.
    pub fn price(&self) -> Price {
        self.fare.price
    }

    /// The price in the base currency.
    pub fn normalized_cost(&self) -> f64 {
        self.cost
    }

    pub fn fare(&self) -> &Fare {
        &self.fare
    }
}

impl PartialEq for Flight {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Flight {}

impl Hash for Flight {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
