//! Domain types for the fare finder.
//!
//! This module contains the core domain model types: airport and currency
//! codes, flights and routes. All types enforce their invariants at
//! construction time, so code that receives these types can trust their
//! validity.

mod airport;
mod directory;
mod error;
mod flight;
mod money;
mod route;

pub use airport::{Airport, AirportCode, CityCode, CountryCode, InvalidCode};
pub use directory::AirportDirectory;
pub use error::DomainError;
pub use flight::{Fare, Flight, FlightKey};
pub use money::{CurrencyCode, Price};
pub use route::{CityKey, ClosedRoute, PartialRoute, average_cost};
