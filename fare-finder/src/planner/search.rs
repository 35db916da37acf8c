//! Lazy best-first search for round trips.
//!
//! The flight network is never known up front. The finder seeds a tree with
//! the fares leaving the root, then repeatedly picks the open partial route
//! with the lowest average cost and fetches the fares that could extend it.
//! Fares landing back on the root close a route and go to the registry
//! instead of the tree. Branches with nowhere left to go are pruned for good.

use std::collections::{BTreeSet, HashMap, HashSet};

use futures::future::try_join_all;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::currency::{CurrencyConverter, CurrencyError, RateSource};
use crate::domain::{
    AirportCode, AirportDirectory, CityCode, ClosedRoute, CountryCode, DomainError, Fare, Flight,
    FlightKey, PartialRoute, Price,
};
use crate::fares::{FareError, FareSource};

use super::config::{ConfigError, RouteConstraints};
use super::rank::{ClosedRouteRegistry, Recorded, rank_routes};
use super::tree::{SearchTree, Selection};
use super::waypoints::{Skeletons, WaypointPlanner};

/// Error from a route search. Any of these aborts the run with no result.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid constraints: {0}")]
    Config(#[from] ConfigError),

    #[error("fare source failed: {0}")]
    Source(#[from] FareError),

    #[error("currency conversion failed: {0}")]
    Currency(#[from] CurrencyError),

    #[error("inconsistent route: {0}")]
    Domain(#[from] DomainError),
}

/// Why the search loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every branch of the tree is dead.
    Exhausted,
    /// Enough distinct city sets have a closed route.
    MaxRoutes,
    /// The time budget ran out.
    TimeBudget,
}

/// Result of a route search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Closed routes at refreshed prices, cheapest per leg first.
    pub routes: Vec<ClosedRoute>,

    /// Number of frontier expansions.
    pub iterations: usize,

    pub stop: StopReason,

    /// Routes dropped because a leg could no longer be booked.
    pub discarded: usize,
}

/// Airports, cities and countries a partial route has already touched.
struct Visited {
    airports: Vec<AirportCode>,
    cities: HashSet<CityCode>,
    countries: HashSet<CountryCode>,
}

impl Visited {
    fn of(airports: Vec<AirportCode>, directory: &AirportDirectory) -> Self {
        let cities = airports.iter().map(|a| directory.city_of(*a)).collect();
        let countries = airports
            .iter()
            .filter_map(|a| directory.country_of(*a))
            .collect();
        Self {
            airports,
            cities,
            countries,
        }
    }
}

fn describe(airports: &[AirportCode]) -> String {
    airports
        .iter()
        .map(AirportCode::as_str)
        .collect::<Vec<_>>()
        .join("->")
}

/// Finds cheap round trips from one airport.
pub struct RouteFinder<'a, S, R> {
    source: &'a S,
    converter: &'a CurrencyConverter<R>,
    directory: &'a AirportDirectory,
}

impl<'a, S: FareSource, R: RateSource> RouteFinder<'a, S, R> {
    pub fn new(
        source: &'a S,
        converter: &'a CurrencyConverter<R>,
        directory: &'a AirportDirectory,
    ) -> Self {
        Self {
            source,
            converter,
            directory,
        }
    }

    /// Search for closed routes satisfying `constraints`.
    ///
    /// The source's memoized state and the exchange-rate table are cleared
    /// when the run ends, whether it succeeded or not.
    pub async fn search(
        &self,
        constraints: &RouteConstraints,
    ) -> Result<SearchOutcome, SearchError> {
        constraints.validate(self.directory)?;

        info!(
            root = %constraints.root,
            not_before = %constraints.not_before,
            until = %constraints.until,
            waypoints = constraints.via.len(),
            "Starting route search"
        );

        let result = self.run(constraints).await;
        self.source.clear();
        self.converter.clear().await;

        match &result {
            Ok(outcome) => info!(
                routes = outcome.routes.len(),
                iterations = outcome.iterations,
                discarded = outcome.discarded,
                stop = ?outcome.stop,
                "Route search finished"
            ),
            Err(e) => warn!(error = %e, "Route search aborted"),
        }
        result
    }

    async fn run(&self, constraints: &RouteConstraints) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();

        let excluded = self.excluded(constraints);
        let skeletons = WaypointPlanner::new(self.source, constraints.max_waypoint_depth)
            .enumerate_starts(constraints.root, &constraints.via, &excluded)
            .await?;

        let mut tree = SearchTree::new();
        let mut registry = ClosedRouteRegistry::new();

        let seeds = self.seed(constraints, &skeletons).await?;
        let seeded = tree.attach(tree.root(), seeds);
        debug!(seeded, "Seeded search tree");

        let mut iterations = 0;
        let stop = loop {
            if registry.len() >= constraints.max_routes {
                break StopReason::MaxRoutes;
            }
            if constraints
                .time_budget
                .is_some_and(|budget| started.elapsed() >= budget)
            {
                break StopReason::TimeBudget;
            }

            let node = match tree.select_frontier() {
                Selection::Dead => break StopReason::Exhausted,
                Selection::Idle => continue,
                Selection::Frontier { node, average_cost } => {
                    trace!(average_cost, "Selected frontier");
                    node
                }
            };

            iterations += 1;
            let route =
                PartialRoute::new(tree.route(node), |a, b| self.directory.same_city(a, b))?;
            let children = self
                .expand(&route, constraints, &skeletons, &mut registry)
                .await?;
            let added = tree.attach(node, children);

            debug!(
                iteration = iterations,
                route = %describe(&route.airports()),
                added,
                closed = registry.len(),
                "Expanded frontier"
            );
        };

        let (routes, discarded) = self.refresh_routes(registry.into_routes()).await?;

        Ok(SearchOutcome {
            routes: rank_routes(routes),
            iterations,
            stop,
            discarded,
        })
    }

    /// Airports no skeleton may pass through.
    fn excluded(&self, constraints: &RouteConstraints) -> HashSet<AirportCode> {
        let mut excluded: HashSet<AirportCode> =
            constraints.airport_blacklist.iter().copied().collect();

        for airport in self.directory.airports() {
            if airport.code == constraints.root {
                continue;
            }
            let blacklisted = constraints.country_blacklist.contains(&airport.country);
            let off_whitelist = (!constraints.airport_whitelist.is_empty()
                && !constraints.airport_whitelist.contains(&airport.code))
                || (!constraints.country_whitelist.is_empty()
                    && !constraints.country_whitelist.contains(&airport.country));
            if blacklisted || off_whitelist {
                excluded.insert(airport.code);
            }
        }

        excluded
    }

    /// First legs: fares leaving the root within the departure window.
    async fn seed(
        &self,
        constraints: &RouteConstraints,
        skeletons: &Skeletons,
    ) -> Result<Vec<Flight>, SearchError> {
        let fares = self
            .source
            .fares_for_origins(
                &[constraints.root],
                constraints.not_before.date_naive(),
                constraints.until.date_naive(),
            )
            .await?;

        let visited = Visited::of(vec![constraints.root], self.directory);
        let mut seeds = Vec::new();

        for fare in fares {
            if fare.departure < constraints.not_before || fare.departure > constraints.until {
                continue;
            }
            let Some(flight) = self.normalize(fare).await? else {
                continue;
            };
            if self.admits(constraints, skeletons, &visited, flight.destination()) {
                seeds.push(flight);
            }
        }

        Ok(seeds)
    }

    /// Fares that could follow `route`. Fares back to the root are recorded
    /// as closed routes rather than returned.
    async fn expand(
        &self,
        route: &PartialRoute,
        constraints: &RouteConstraints,
        skeletons: &Skeletons,
        registry: &mut ClosedRouteRegistry,
    ) -> Result<Vec<Flight>, SearchError> {
        let cap = route.first_departure() + constraints.max_away();
        let earliest = route.last_arrival() + constraints.min_stay();
        let latest = (route.last_arrival() + constraints.max_stay()).min(cap);
        if earliest > latest {
            return Ok(Vec::new());
        }

        let origins = self.directory.city_group(route.last_destination());
        let fares = self
            .source
            .fares_for_origins(&origins, earliest.date_naive(), latest.date_naive())
            .await?;

        let visited = Visited::of(route.airports(), self.directory);
        let mut children = Vec::new();

        for fare in fares {
            if fare.departure < earliest || fare.departure > latest || fare.arrival > cap {
                continue;
            }
            let Some(flight) = self.normalize(fare).await? else {
                continue;
            };

            if flight.destination() == constraints.root {
                self.close(route, flight, constraints, skeletons, registry)?;
            } else if self.admits(constraints, skeletons, &visited, flight.destination()) {
                children.push(flight);
            }
        }

        Ok(children)
    }

    /// Whether a route that has visited `visited` may continue to `destination`.
    fn admits(
        &self,
        constraints: &RouteConstraints,
        skeletons: &Skeletons,
        visited: &Visited,
        destination: AirportCode,
    ) -> bool {
        if visited.cities.contains(&self.directory.city_of(destination)) {
            return false;
        }
        if constraints.airport_blacklist.contains(&destination) {
            return false;
        }
        if !constraints.airport_whitelist.is_empty()
            && !constraints.airport_whitelist.contains(&destination)
        {
            return false;
        }

        let country = self.directory.country_of(destination);
        if country.is_some_and(|c| constraints.country_blacklist.contains(&c)) {
            return false;
        }
        if !constraints.country_whitelist.is_empty()
            && !country.is_some_and(|c| constraints.country_whitelist.contains(&c))
        {
            return false;
        }
        if constraints.unique_country && country.is_some_and(|c| visited.countries.contains(&c)) {
            return false;
        }

        if !skeletons.is_unconstrained() {
            let mut prefix = visited.airports.clone();
            prefix.push(destination);
            return skeletons.admits(&prefix);
        }

        true
    }

    /// Offer `route` closed by `closing` to the registry.
    fn close(
        &self,
        route: &PartialRoute,
        closing: Flight,
        constraints: &RouteConstraints,
        skeletons: &Skeletons,
        registry: &mut ClosedRouteRegistry,
    ) -> Result<(), SearchError> {
        let closed = ClosedRoute::new(route, closing, constraints.root)?;
        if !skeletons.satisfied_by(&closed.airports()) {
            trace!(route = %closed, "Closed route misses waypoints");
            return Ok(());
        }

        let key = closed.city_key(|a| self.directory.city_of(a));
        let total = closed.total_cost();
        let path = describe(&closed.airports());

        match registry.record(key.clone(), closed) {
            Recorded::New | Recorded::Improved => {
                debug!(cities = %key, %path, total, "Recorded closed route");
            }
            Recorded::Kept => {
                trace!(cities = %key, %path, total, "Closed route not cheaper");
            }
        }
        Ok(())
    }

    /// Convert a fare into a flight at the current exchange rate. Fares that
    /// fail validation are skipped.
    async fn normalize(&self, fare: Fare) -> Result<Option<Flight>, SearchError> {
        let rate = self.converter.exchange_rate(fare.price.currency).await?;
        match Flight::new(fare, rate) {
            Ok(flight) => Ok(Some(flight)),
            Err(e) => {
                warn!(error = %e, "Skipping invalid fare");
                Ok(None)
            }
        }
    }

    /// Re-price every leg of every route, once per distinct flight. Routes
    /// with a leg that can no longer be booked are dropped.
    async fn refresh_routes(
        &self,
        routes: Vec<ClosedRoute>,
    ) -> Result<(Vec<ClosedRoute>, usize), SearchError> {
        let keys: BTreeSet<FlightKey> = routes
            .iter()
            .flat_map(|route| route.legs().iter().map(Flight::key))
            .collect();

        let refreshed = try_join_all(keys.iter().map(|key| async move {
            let quote = match self.source.refresh(key).await? {
                Some(price) => Some((price, self.converter.exchange_rate(price.currency).await?)),
                None => None,
            };
            Ok::<_, SearchError>((*key, quote))
        }))
        .await?;
        let quotes: HashMap<FlightKey, Option<(Price, f64)>> = refreshed.into_iter().collect();

        let total = routes.len();
        let routes: Vec<ClosedRoute> = routes
            .iter()
            .filter_map(|route| {
                route.repriced(|leg| match quotes.get(&leg.key()) {
                    Some(Some((price, rate))) => leg.repriced(*price, *rate).ok(),
                    _ => None,
                })
            })
            .collect();
        let discarded = total - routes.len();

        debug!(legs = keys.len(), discarded, "Refreshed closed routes");
        Ok((routes, discarded))
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
