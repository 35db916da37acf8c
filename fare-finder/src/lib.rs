//! Cheapest round-trip fare finder.
//!
//! A library and command-line tool that answers: "starting from this
//! airport, which multi-city round trips cost the least per flight?"

pub mod cache;
pub mod currency;
pub mod domain;
pub mod fares;
pub mod planner;
pub mod retry;
