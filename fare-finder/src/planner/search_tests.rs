//! Unit tests for the lazy best-first route search.

use super::*;
use crate::cache::{CacheConfig, CachedFareSource};
use crate::currency::FixedRates;
use crate::domain::{Airport, CurrencyCode};
use crate::fares::{MockFareSource, RetryingFareSource};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration as StdDuration;

fn code(s: &str) -> AirportCode {
    AirportCode::parse(s).unwrap()
}

fn currency(s: &str) -> CurrencyCode {
    CurrencyCode::parse(s).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn fare(from: &str, to: &str, day: u32, hour: u32, amount: f64, cur: &str) -> Fare {
    Fare {
        origin: code(from),
        destination: code(to),
        departure: at(day, hour),
        arrival: at(day, hour) + Duration::hours(2),
        price: Price::new(amount, currency(cur)),
    }
}

fn airport(code_str: &str, city: &str, country: &str) -> Airport {
    Airport::new(
        code(code_str),
        code_str,
        CityCode::parse(city).unwrap(),
        CountryCode::parse(country).unwrap(),
    )
}

/// AAA in GB, BBB in IE, CCC and DDD in PL, EEE shares a city with DDD.
fn directory() -> AirportDirectory {
    [
        airport("AAA", "AAA", "GB"),
        airport("BBB", "BBB", "IE"),
        airport("CCC", "CCC", "PL"),
        airport("DDD", "DDD", "PL"),
        airport("EEE", "DDD", "PL"),
    ]
    .into_iter()
    .collect()
}

/// A->B 50, B->A 40 GBP-equivalent, A->C 30, C->D 20, D->A 60.
///
/// B->A is quoted as 20 GBP at 0.5 GBP per EUR.
fn network() -> MockFareSource {
    let mut source = MockFareSource::new();
    source.add_fare(fare("AAA", "BBB", 1, 8, 50.0, "EUR"));
    source.add_fare(fare("BBB", "AAA", 3, 8, 20.0, "GBP"));
    source.add_fare(fare("AAA", "CCC", 1, 9, 30.0, "EUR"));
    source.add_fare(fare("CCC", "DDD", 3, 9, 20.0, "EUR"));
    source.add_fare(fare("DDD", "AAA", 5, 8, 60.0, "EUR"));
    source
}

fn converter() -> CurrencyConverter<FixedRates> {
    CurrencyConverter::new(
        FixedRates::new().with_rate(currency("GBP"), 0.5),
        currency("EUR"),
        RetryPolicy::no_retry(),
    )
}

/// Departures on day 1, one night minimum, five days away at most.
fn constraints() -> RouteConstraints {
    RouteConstraints::new(code("AAA"), at(1, 0), at(1, 23))
        .with_stay_days(1, 5)
        .with_max_away_days(5)
}

fn paths(outcome: &SearchOutcome) -> Vec<String> {
    outcome
        .routes
        .iter()
        .map(|r| describe(&r.airports()))
        .collect()
}

#[tokio::test]
async fn finds_one_route_per_city_set_ranked_by_cost_per_leg() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();

    assert_eq!(outcome.stop, StopReason::Exhausted);
    assert_eq!(paths(&outcome), vec!["AAA->CCC->DDD->AAA", "AAA->BBB->AAA"]);

    // 110 / 3 ranks above 90 / 2
    let costs: Vec<f64> = outcome.routes.iter().map(ClosedRoute::total_cost).collect();
    assert_eq!(costs, vec![110.0, 90.0]);
    assert!(outcome.routes[0].average_cost() < outcome.routes[1].average_cost());
    assert_eq!(outcome.discarded, 0);
}

#[tokio::test]
async fn never_revisits_an_airport() {
    let mut source = network();
    // Tempting loops back through visited airports
    source.add_fare(fare("DDD", "CCC", 4, 12, 1.0, "EUR"));
    source.add_fare(fare("BBB", "BBB", 3, 9, 1.0, "EUR"));
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();

    for route in &outcome.routes {
        let airports = route.airports();
        let stops = &airports[..airports.len() - 1];
        let distinct: HashSet<&AirportCode> = stops.iter().collect();
        assert_eq!(distinct.len(), stops.len(), "revisit in {route}");
    }
    assert_eq!(outcome.routes.len(), 2);
}

#[tokio::test]
async fn each_node_is_expanded_at_most_once() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();

    // CCC, BBB, then CCC->DDD; dead branches are never fetched again
    assert_eq!(outcome.iterations, 3);
    // Seeding, CCC, BBB, then both airports of DDD's city
    assert_eq!(source.calls("fares"), 5);
}

#[tokio::test]
async fn max_routes_stops_after_first_closed_route() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder
        .search(&constraints().with_max_routes(1))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::MaxRoutes);
    assert_eq!(paths(&outcome), vec!["AAA->BBB->AAA"]);
    // Seed, CCC, BBB; nothing after the route closed
    assert_eq!(outcome.iterations, 2);
    assert_eq!(source.calls("fares"), 3);
}

#[tokio::test]
async fn closing_fare_must_arrive_within_max_away() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    // D->A lands on day 5 at 10:00, more than four days after leaving
    let outcome = finder
        .search(&constraints().with_max_away_days(4))
        .await
        .unwrap();

    assert_eq!(paths(&outcome), vec!["AAA->BBB->AAA"]);
}

#[tokio::test]
async fn stay_window_is_respected() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    // Every connection above waits less than three days
    let outcome = finder
        .search(&constraints().with_stay_days(3, 5))
        .await
        .unwrap();

    assert!(outcome.routes.is_empty());
    assert_eq!(outcome.stop, StopReason::Exhausted);
}

#[tokio::test]
async fn connections_after_the_longest_stay_are_ignored() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    // Every onward fare leaves about two days after landing
    let outcome = finder
        .search(&constraints().with_stay_days(1, 1))
        .await
        .unwrap();
    assert!(outcome.routes.is_empty());

    let outcome = finder
        .search(&constraints().with_stay_days(1, 2))
        .await
        .unwrap();
    assert!(paths(&outcome).contains(&"AAA->BBB->AAA".to_string()));
}

#[tokio::test]
async fn departures_after_the_window_are_not_seeded() {
    let mut source = network();
    // Same calendar day as the window, but after it closes
    source.add_fare(fare("AAA", "EEE", 1, 20, 10.0, "EUR"));
    source.add_fare(fare("EEE", "AAA", 3, 8, 10.0, "EUR"));
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let morning = RouteConstraints::new(code("AAA"), at(1, 0), at(1, 12))
        .with_stay_days(1, 5)
        .with_max_away_days(5);
    let outcome = finder.search(&morning).await.unwrap();
    assert_eq!(paths(&outcome), vec!["AAA->CCC->DDD->AAA", "AAA->BBB->AAA"]);

    let outcome = finder.search(&constraints()).await.unwrap();
    assert_eq!(paths(&outcome)[0], "AAA->EEE->AAA");
}

#[tokio::test]
async fn connects_through_any_airport_of_a_city() {
    let mut source = MockFareSource::new();
    source.add_fare(fare("AAA", "CCC", 1, 9, 30.0, "EUR"));
    source.add_fare(fare("CCC", "DDD", 3, 9, 20.0, "EUR"));
    source.add_fare(fare("EEE", "AAA", 5, 8, 25.0, "EUR"));
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();

    assert_eq!(paths(&outcome), vec!["AAA->CCC->DDD->AAA"]);
    assert_eq!(outcome.routes[0].legs()[2].origin(), code("EEE"));
    assert_eq!(outcome.routes[0].total_cost(), 75.0);
}

#[tokio::test]
async fn waypoints_restrict_routes() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder
        .search(&constraints().with_via([code("DDD")]))
        .await
        .unwrap();

    assert_eq!(paths(&outcome), vec!["AAA->CCC->DDD->AAA"]);
}

#[tokio::test]
async fn unreachable_waypoint_yields_nothing() {
    let mut source = network();
    source.add_fare(fare("EEE", "AAA", 5, 9, 10.0, "EUR"));
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    // Nothing flies into EEE
    let outcome = finder
        .search(&constraints().with_via([code("EEE")]))
        .await
        .unwrap();

    assert!(outcome.routes.is_empty());
}

#[tokio::test]
async fn airport_lists_filter_destinations() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let blacklisted = finder
        .search(&constraints().with_airport_blacklist([code("BBB")]))
        .await
        .unwrap();
    assert_eq!(paths(&blacklisted), vec!["AAA->CCC->DDD->AAA"]);

    let whitelisted = finder
        .search(&constraints().with_airport_whitelist([code("BBB")]))
        .await
        .unwrap();
    assert_eq!(paths(&whitelisted), vec!["AAA->BBB->AAA"]);
}

#[tokio::test]
async fn country_lists_filter_destinations() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);
    let poland = CountryCode::parse("PL").unwrap();

    let blacklisted = finder
        .search(&constraints().with_country_blacklist([poland]))
        .await
        .unwrap();
    assert_eq!(paths(&blacklisted), vec!["AAA->BBB->AAA"]);

    let whitelisted = finder
        .search(&constraints().with_country_whitelist([poland]))
        .await
        .unwrap();
    assert_eq!(paths(&whitelisted), vec!["AAA->CCC->DDD->AAA"]);
}

#[tokio::test]
async fn unique_country_rejects_second_visit() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    // CCC and DDD are both in Poland
    let outcome = finder
        .search(&constraints().with_unique_country(true))
        .await
        .unwrap();

    assert_eq!(paths(&outcome), vec!["AAA->BBB->AAA"]);
}

#[tokio::test]
async fn refresh_drops_sold_out_routes_and_reprices_the_rest() {
    let mut source = network();
    source.set_refreshed(fare("BBB", "AAA", 3, 8, 0.0, "GBP").key(), None);
    source.set_refreshed(
        fare("DDD", "AAA", 5, 8, 0.0, "EUR").key(),
        Some(Price::new(10.0, currency("EUR"))),
    );
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();

    assert_eq!(paths(&outcome), vec!["AAA->CCC->DDD->AAA"]);
    assert_eq!(outcome.routes[0].total_cost(), 60.0);
    assert_eq!(outcome.discarded, 1);
}

#[tokio::test]
async fn shared_legs_are_refreshed_once() {
    let mut source = MockFareSource::new();
    source.add_fare(fare("AAA", "BBB", 1, 8, 50.0, "EUR"));
    source.add_fare(fare("BBB", "AAA", 3, 8, 40.0, "EUR"));
    source.add_fare(fare("BBB", "CCC", 3, 9, 10.0, "EUR"));
    source.add_fare(fare("CCC", "AAA", 5, 8, 10.0, "EUR"));
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();

    assert_eq!(outcome.routes.len(), 2);
    let legs: usize = outcome.routes.iter().map(ClosedRoute::leg_count).sum();
    assert_eq!(legs, 5);
    // A->B appears in both routes
    assert_eq!(source.calls("refresh"), 4);
}

#[tokio::test]
async fn invalid_fares_are_skipped() {
    let mut source = network();
    let mut broken = fare("AAA", "EEE", 1, 10, 5.0, "EUR");
    broken.arrival = broken.departure - Duration::hours(1);
    source.add_fare(broken);
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();
    assert_eq!(outcome.routes.len(), 2);
}

#[tokio::test]
async fn unknown_currency_aborts() {
    let mut source = network();
    source.add_fare(fare("AAA", "EEE", 1, 10, 5.0, "PLN"));
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let result = finder.search(&constraints()).await;
    assert!(matches!(
        result,
        Err(SearchError::Currency(CurrencyError::UnknownCurrency(_)))
    ));
}

#[tokio::test]
async fn invalid_constraints_fail_before_fetching() {
    let source = network();
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let mut bad = constraints();
    bad.root = code("ZZZ");
    let result = finder.search(&bad).await;

    assert!(matches!(
        result,
        Err(SearchError::Config(ConfigError::UnknownAirport(_)))
    ));
    assert_eq!(source.calls("fares"), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_absorbed() {
    let source = network();
    source.fail_next(3);
    let retrying = RetryingFareSource::new(source, RetryPolicy::default());
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&retrying, &rates, &dir);

    let outcome = finder.search(&constraints()).await.unwrap();
    assert_eq!(outcome.routes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_aborts_the_run() {
    let source = network();
    source.fail_fatally();
    let retrying = RetryingFareSource::new(source, RetryPolicy::default());
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&retrying, &rates, &dir);

    let result = finder.search(&constraints()).await;

    assert!(matches!(
        result,
        Err(SearchError::Source(FareError::Unauthorized))
    ));
    // The root's route listing is the first call; nothing follows it
    assert_eq!(retrying.inner().calls("destinations"), 1);
    assert_eq!(retrying.inner().calls("fares"), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_abort_the_run() {
    let source = network();
    source.fail_next(100);
    let retrying = RetryingFareSource::new(source, RetryPolicy::default());
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&retrying, &rates, &dir);

    let result = finder.search(&constraints()).await;

    assert!(matches!(
        result,
        Err(SearchError::Source(FareError::Exhausted { attempts: 7, .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn time_budget_stops_the_loop() {
    let retrying = RetryingFareSource::new(
        network(),
        RetryPolicy::no_retry().with_call_delay(StdDuration::from_secs(1)),
    );
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&retrying, &rates, &dir);

    // Seeding and the first expansion each make two calls, a second apiece
    let outcome = finder
        .search(&constraints().with_time_budget(StdDuration::from_secs(4)))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::TimeBudget);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.routes.is_empty());
}

#[tokio::test]
async fn cache_is_cleared_between_runs() {
    let cached = CachedFareSource::new(network(), &CacheConfig::default());
    let rates = converter();
    let dir = directory();
    let finder = RouteFinder::new(&cached, &rates, &dir);

    finder.search(&constraints()).await.unwrap();
    let first_run = cached.inner().calls("fares");

    finder.search(&constraints()).await.unwrap();
    assert_eq!(cached.inner().calls("fares"), 2 * first_run);
}

/// GBP at 0.5 per EUR on the first fetch, 0.25 on every later one.
struct ShiftingRates {
    fetches: AtomicU32,
}

impl RateSource for ShiftingRates {
    async fn rates(&self, _base: CurrencyCode) -> Result<HashMap<CurrencyCode, f64>, FareError> {
        let rate = match self.fetches.fetch_add(1, Ordering::SeqCst) {
            0 => 0.5,
            _ => 0.25,
        };
        Ok(HashMap::from([(currency("GBP"), rate)]))
    }
}

#[tokio::test]
async fn exchange_rates_are_fetched_once_per_run() {
    let source = network();
    let rates = CurrencyConverter::new(
        ShiftingRates {
            fetches: AtomicU32::new(0),
        },
        currency("EUR"),
        RetryPolicy::no_retry(),
    );
    let dir = directory();
    let finder = RouteFinder::new(&source, &rates, &dir);

    let cost_via_b = |outcome: &SearchOutcome| {
        outcome
            .routes
            .iter()
            .find(|r| describe(&r.airports()) == "AAA->BBB->AAA")
            .map(ClosedRoute::total_cost)
    };

    // B->A is 20 GBP: 40 EUR on the first run, 80 EUR on the second
    let first = finder.search(&constraints()).await.unwrap();
    assert_eq!(cost_via_b(&first), Some(90.0));

    let second = finder.search(&constraints()).await.unwrap();
    assert_eq!(cost_via_b(&second), Some(130.0));
    assert_eq!(rates_fetches(&rates), 2);
}

fn rates_fetches(converter: &CurrencyConverter<ShiftingRates>) -> u32 {
    converter.source().fetches.load(Ordering::SeqCst)
}
