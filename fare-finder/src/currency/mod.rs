//! Currency conversion into the base currency.
//!
//! Fares are quoted in the currency of the departure market. The search
//! compares costs in a single base currency, using a rate table fetched once
//! per run.

mod client;
mod converter;

pub use client::{RateClient, RateClientConfig};
pub use converter::{CurrencyConverter, CurrencyError, FixedRates, RateSource};
