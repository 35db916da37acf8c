//! Route types.
//!
//! A `PartialRoute` is an open itinerary that starts at the root airport and
//! has not yet returned. A `ClosedRoute` is one that has.

use std::fmt;

use chrono::{DateTime, Utc};

use super::{AirportCode, CityCode, DomainError, Flight};

/// Average cost per discretionary hop.
///
/// The first leg is the unavoidable cost of leaving the origin, so it is
/// excluded from the divisor once there is more than one leg. A single leg
/// is divided by one.
pub fn average_cost(costs: &[f64]) -> f64 {
    let total: f64 = costs.iter().sum();
    match costs.len() {
        0 => 0.0,
        1 => total,
        n => total / (n - 1) as f64,
    }
}

/// A non-empty chain of connecting flights.
///
/// # Invariants
///
/// - At least one leg
/// - Each leg departs from the city the previous leg arrived in
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRoute {
    legs: Vec<Flight>,
}

impl PartialRoute {
    /// Construct a route, checking that consecutive legs connect.
    ///
    /// `same_city` decides whether an arrival airport and the next departure
    /// airport belong to one city-group.
    pub fn new(
        legs: Vec<Flight>,
        same_city: impl Fn(AirportCode, AirportCode) -> bool,
    ) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyRoute);
        }

        for pair in legs.windows(2) {
            let (arrived, departs) = (pair[0].destination(), pair[1].origin());
            if !same_city(arrived, departs) {
                return Err(DomainError::Disconnected { arrived, departs });
            }
        }

        Ok(Self { legs })
    }

    pub fn legs(&self) -> &[Flight] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn first(&self) -> &Flight {
        &self.legs[0]
    }

    pub fn last(&self) -> &Flight {
        &self.legs[self.legs.len() - 1]
    }

    pub fn origin(&self) -> AirportCode {
        self.first().origin()
    }

    pub fn last_destination(&self) -> AirportCode {
        self.last().destination()
    }

    pub fn first_departure(&self) -> DateTime<Utc> {
        self.first().departure()
    }

    pub fn last_arrival(&self) -> DateTime<Utc> {
        self.last().arrival()
    }

    /// Origin followed by the destination of every leg.
    pub fn airports(&self) -> Vec<AirportCode> {
        std::iter::once(self.origin())
            .chain(self.legs.iter().map(Flight::destination))
            .collect()
    }

    pub fn total_cost(&self) -> f64 {
        self.legs.iter().map(Flight::normalized_cost).sum()
    }

    /// See [`average_cost`].
    pub fn average_cost(&self) -> f64 {
        let costs: Vec<f64> = self.legs.iter().map(Flight::normalized_cost).collect();
        average_cost(&costs)
    }
}

/// The cities a closed route passes through, excluding the root city.
/// Sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CityKey(Vec<CityCode>);

impl CityKey {
    pub fn new(cities: impl IntoIterator<Item = CityCode>) -> Self {
        let mut cities: Vec<CityCode> = cities.into_iter().collect();
        cities.sort();
        cities.dedup();
        Self(cities)
    }

    pub fn cities(&self) -> &[CityCode] {
        &self.0
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(CityCode::as_str).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

/// A route that has returned to its root airport.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedRoute {
    legs: Vec<Flight>,
}

impl ClosedRoute {
    /// Close `route` with `closing`, which must land on `root`.
    pub fn new(
        route: &PartialRoute,
        closing: Flight,
        root: AirportCode,
    ) -> Result<Self, DomainError> {
        if closing.destination() != root {
            return Err(DomainError::NotClosed {
                expected: root,
                actual: closing.destination(),
            });
        }

        let mut legs = route.legs().to_vec();
        legs.push(closing);
        Ok(Self { legs })
    }

    /// The same itinerary with each leg replaced by `reprice(leg)`.
    ///
    /// Returns `None` as soon as any leg cannot be repriced.
    pub fn repriced(&self, mut reprice: impl FnMut(&Flight) -> Option<Flight>) -> Option<Self> {
        let legs = self
            .legs
            .iter()
            .map(&mut reprice)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { legs })
    }

    pub fn legs(&self) -> &[Flight] {
        &self.legs
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    pub fn root(&self) -> AirportCode {
        self.legs[0].origin()
    }

    /// Root followed by the destination of every leg (so the root appears
    /// at both ends).
    pub fn airports(&self) -> Vec<AirportCode> {
        std::iter::once(self.root())
            .chain(self.legs.iter().map(Flight::destination))
            .collect()
    }

    pub fn departure(&self) -> DateTime<Utc> {
        self.legs[0].departure()
    }

    pub fn arrival(&self) -> DateTime<Utc> {
        self.legs[self.legs.len() - 1].arrival()
    }

    /// Sum of the normalized cost of every leg.
    pub fn total_cost(&self) -> f64 {
        self.legs.iter().map(Flight::normalized_cost).sum()
    }

    /// Total cost per leg, used for final ranking.
    pub fn average_cost(&self) -> f64 {
        self.total_cost() / self.legs.len() as f64
    }

    /// Distinct intermediate cities, root city excluded.
    pub fn city_key(&self, city_of: impl Fn(AirportCode) -> CityCode) -> CityKey {
        let root_city = city_of(self.root());
        let last = self.legs.len() - 1;
        CityKey::new(
            self.legs[..last]
                .iter()
                .map(|leg| city_of(leg.destination()))
                .filter(|city| city != &root_city),
        )
    }
}

impl fmt::Display for ClosedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.airports().iter().map(|c| c.to_string()).collect();
        write!(f, "{} ({:.2})", path.join("->"), self.total_cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurrencyCode, Fare, Price};
    use chrono::{Duration, TimeZone};

    fn code(s: &str) -> AirportCode {
        AirportCode::parse(s).unwrap()
    }

    fn flight(from: &str, to: &str, day: u32, amount: f64) -> Flight {
        let departure = Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap();
        Flight::new(
            Fare {
                origin: code(from),
                destination: code(to),
                departure,
                arrival: departure + Duration::hours(2),
                price: Price::new(amount, CurrencyCode::parse("EUR").unwrap()),
            },
            1.0,
        )
        .unwrap()
    }

    fn same_airport(a: AirportCode, b: AirportCode) -> bool {
        a == b
    }

    #[test]
    fn single_leg_average_is_its_cost() {
        let route = PartialRoute::new(vec![flight("AAA", "BBB", 1, 50.0)], same_airport).unwrap();
        assert_eq!(route.average_cost(), 50.0);
    }

    #[test]
    fn multi_leg_average_excludes_anchor_from_divisor() {
        let route = PartialRoute::new(
            vec![
                flight("AAA", "CCC", 1, 30.0),
                flight("CCC", "DDD", 2, 20.0),
                flight("DDD", "EEE", 3, 10.0),
            ],
            same_airport,
        )
        .unwrap();
        assert_eq!(route.total_cost(), 60.0);
        assert_eq!(route.average_cost(), 30.0);
    }

    #[test]
    fn empty_route_rejected() {
        assert_eq!(
            PartialRoute::new(vec![], same_airport),
            Err(DomainError::EmptyRoute)
        );
    }

    #[test]
    fn disconnected_legs_rejected() {
        let result = PartialRoute::new(
            vec![flight("AAA", "BBB", 1, 1.0), flight("CCC", "DDD", 2, 1.0)],
            same_airport,
        );
        assert!(matches!(result, Err(DomainError::Disconnected { .. })));
    }

    #[test]
    fn city_group_connection_accepted() {
        let result = PartialRoute::new(
            vec![flight("AAA", "STN", 1, 1.0), flight("LTN", "DDD", 2, 1.0)],
            |a, b| a == b || (a.as_str() != "AAA" && b.as_str() != "AAA"),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn closed_route_must_land_on_root() {
        let route = PartialRoute::new(vec![flight("AAA", "BBB", 1, 50.0)], same_airport).unwrap();
        let wrong = ClosedRoute::new(&route, flight("BBB", "CCC", 2, 40.0), code("AAA"));
        assert!(matches!(wrong, Err(DomainError::NotClosed { .. })));

        let closed = ClosedRoute::new(&route, flight("BBB", "AAA", 2, 40.0), code("AAA")).unwrap();
        assert_eq!(closed.leg_count(), 2);
        assert_eq!(closed.total_cost(), 90.0);
        assert_eq!(closed.average_cost(), 45.0);
        assert_eq!(closed.airports(), vec![code("AAA"), code("BBB"), code("AAA")]);
        assert_eq!(closed.to_string(), "AAA->BBB->AAA (90.00)");
    }

    #[test]
    fn city_key_excludes_root_and_deduplicates() {
        let route = PartialRoute::new(
            vec![
                flight("AAA", "CCC", 1, 1.0),
                flight("CCC", "DDD", 2, 1.0),
                flight("DDD", "EEE", 3, 1.0),
            ],
            same_airport,
        )
        .unwrap();
        let closed = ClosedRoute::new(&route, flight("EEE", "AAA", 4, 1.0), code("AAA")).unwrap();

        // DDD and EEE share a city
        let key = closed.city_key(|c| match c.as_str() {
            "EEE" => CityCode::parse("DDD").unwrap(),
            other => CityCode::parse(other).unwrap(),
        });
        assert_eq!(key.to_string(), "{CCC,DDD}");
    }

    #[test]
    fn repriced_fails_when_any_leg_is_gone() {
        let route = PartialRoute::new(vec![flight("AAA", "BBB", 1, 50.0)], same_airport).unwrap();
        let closed = ClosedRoute::new(&route, flight("BBB", "AAA", 2, 40.0), code("AAA")).unwrap();

        let cheaper = closed
            .repriced(|leg| leg.repriced(Price::new(10.0, leg.price().currency), 1.0).ok())
            .unwrap();
        assert_eq!(cheaper.total_cost(), 20.0);

        let gone = closed.repriced(|leg| {
            if leg.origin() == code("BBB") {
                None
            } else {
                Some(leg.clone())
            }
        });
        assert!(gone.is_none());
    }
}
