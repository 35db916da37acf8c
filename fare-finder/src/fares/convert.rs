//! Conversion from wire types to domain types.
//!
//! Airports and routes with unusable codes are skipped. Fares are stricter:
//! a flight with seats left but no parseable time or price means the payload
//! is broken, and the whole response is rejected so it can be retried.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{Airport, AirportCode, CityCode, CountryCode, CurrencyCode, Fare, Price};

use super::error::FareError;
use super::types::{AirportDto, AvailabilityDto, FlightDto, RouteDto};

/// Convert the airport listing, dropping entries without valid codes.
pub fn convert_airports(dtos: Vec<AirportDto>) -> Vec<Airport> {
    dtos.into_iter()
        .filter_map(|dto| {
            let code = AirportCode::parse(dto.code.as_deref()?).ok()?;
            let country = dto
                .country
                .as_ref()
                .and_then(|c| c.code.as_deref())
                .and_then(|c| CountryCode::parse(c).ok());
            let Some(country) = country else {
                debug!(airport = %code, "Skipping airport without country");
                return None;
            };
            let city = dto
                .city
                .as_ref()
                .and_then(|c| c.code.as_deref())
                .and_then(|c| CityCode::parse(c).ok())
                .unwrap_or_else(|| CityCode::of_airport(code));
            let name = dto.name.unwrap_or_else(|| code.to_string());
            Some(Airport::new(code, name, city, country))
        })
        .collect()
}

/// Convert the route listing to direct destinations only.
pub fn convert_routes(dtos: Vec<RouteDto>) -> Vec<AirportCode> {
    let mut destinations: Vec<AirportCode> = dtos
        .into_iter()
        .filter(|dto| dto.connecting_airport.is_none())
        .filter_map(|dto| {
            let arrival = dto.arrival_airport?;
            AirportCode::parse(arrival.code.as_deref()?).ok()
        })
        .collect();
    destinations.sort();
    destinations.dedup();
    destinations
}

/// Convert an availability response into fares with seats left.
pub fn convert_availability(
    dto: &AvailabilityDto,
    origin: AirportCode,
    destination: AirportCode,
) -> Result<Vec<Fare>, FareError> {
    let context = || format!("availability {origin}->{destination}");

    let currency = dto
        .currency
        .as_deref()
        .ok_or_else(|| FareError::MissingField {
            field: "currency",
            context: context(),
        })?;
    let currency = CurrencyCode::parse(currency).map_err(|_| FareError::Malformed {
        field: "currency",
        value: currency.to_string(),
    })?;

    let trips = dto.trips.as_ref().ok_or_else(|| FareError::MissingField {
        field: "trips",
        context: context(),
    })?;

    let mut fares = Vec::new();
    for flight in trips.iter().flat_map(|t| &t.dates).flat_map(|d| &d.flights) {
        if flight.fares_left.unwrap_or(0) <= 0 {
            continue;
        }
        let Some(regular) = &flight.regular_fare else {
            continue;
        };
        let amount = regular
            .fares
            .first()
            .and_then(|f| f.amount)
            .ok_or_else(|| FareError::MissingField {
                field: "regularFare.fares[0].amount",
                context: context(),
            })?;
        let (departure, arrival) = flight_times(flight, &context)?;

        fares.push(Fare {
            origin,
            destination,
            departure,
            arrival,
            price: Price::new(amount, currency),
        });
    }

    Ok(fares)
}

fn flight_times(
    flight: &FlightDto,
    context: &impl Fn() -> String,
) -> Result<(DateTime<Utc>, DateTime<Utc>), FareError> {
    let times = flight
        .time_utc
        .as_deref()
        .filter(|t| t.len() >= 2)
        .ok_or_else(|| FareError::MissingField {
            field: "timeUTC",
            context: context(),
        })?;
    Ok((parse_utc(&times[0])?, parse_utc(&times[1])?))
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_utc(s: &str) -> Result<DateTime<Utc>, FareError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| FareError::Malformed {
            field: "timeUTC",
            value: s.to_string(),
        })
}
