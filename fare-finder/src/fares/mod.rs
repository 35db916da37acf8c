//! Fare source access.
//!
//! This module defines the [`FareSource`] contract the route finder explores
//! the flight network through, a retrying wrapper around it, an HTTP client
//! for the Ryanair public API and an in-memory mock.
//!
//! Key characteristics of the source:
//! - Only **direct** flights are considered; connecting itineraries are
//!   filtered out of the route listing
//! - Times are UTC RFC 3339 strings
//! - Availability is queried per route and day, so a city-wide fare query
//!   fans out into one request per destination

mod client;
mod convert;
mod error;
mod mock;
mod source;
mod types;

pub use client::{FareClient, FareClientConfig};
pub use convert::{convert_airports, convert_availability, convert_routes};
pub use error::FareError;
pub use mock::MockFareSource;
pub use source::{FareSource, RetryingFareSource};
pub use types::{AirportDto, AvailabilityDto, FlightDto, RouteDto};
