//! Wire types for the Ryanair public API.
//!
//! Fields the search depends on are `Option` so that a response missing
//! them surfaces as [`FareError::MissingField`](super::FareError) (which is
//! retried) rather than a hard deserialization failure.

use serde::Deserialize;

/// A code with an optional display name (`{"code": "IE", "name": "Ireland"}`).
#[derive(Debug, Clone, Deserialize)]
pub struct NamedCode {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// One entry of the airport autocomplete listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AirportDto {
    pub code: Option<String>,
    pub name: Option<String>,
    pub city: Option<NamedCode>,
    pub country: Option<NamedCode>,
}

/// One entry of the route autocomplete listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDto {
    pub arrival_airport: Option<NamedCode>,
    /// Present when the route needs a change of plane.
    pub connecting_airport: Option<NamedCode>,
}

/// Response of the booking availability endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityDto {
    pub currency: Option<String>,
    pub trips: Option<Vec<TripDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TripDto {
    pub origin: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub dates: Vec<TripDateDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDateDto {
    pub date_out: Option<String>,
    #[serde(default)]
    pub flights: Vec<FlightDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDto {
    pub fares_left: Option<i32>,
    pub flight_number: Option<String>,
    /// Absent when the flight is sold out.
    pub regular_fare: Option<RegularFareDto>,
    /// `[departure, arrival]` as RFC 3339 UTC timestamps.
    #[serde(rename = "timeUTC")]
    pub time_utc: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegularFareDto {
    #[serde(default)]
    pub fares: Vec<FareAmountDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FareAmountDto {
    pub amount: Option<f64>,
}
