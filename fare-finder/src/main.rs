use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fare_finder::cache::{CacheConfig, CachedFareSource};
use fare_finder::currency::{
    CurrencyConverter, FixedRates, RateClient, RateClientConfig, RateSource,
};
use fare_finder::domain::{AirportCode, AirportDirectory, CountryCode, CurrencyCode, InvalidCode};
use fare_finder::fares::{
    FareClient, FareClientConfig, FareError, FareSource, MockFareSource, RetryingFareSource,
};
use fare_finder::planner::{RouteConstraints, RouteFinder, SearchError};
use fare_finder::retry::RetryPolicy;

/// Days searched for a first departure when `FARE_UNTIL` is not set.
const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Fare(#[from] FareError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| CliError::Env {
            var: name,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_code<T>(
    name: &'static str,
    value: &str,
    parse: fn(&str) -> Result<T, InvalidCode>,
) -> Result<T, CliError> {
    parse(value.trim()).map_err(|e| CliError::Env {
        var: name,
        message: e.to_string(),
    })
}

/// Comma-separated codes, e.g. `FARE_VIA=KRK,BUD`.
fn parse_list<T>(
    name: &'static str,
    parse: fn(&str) -> Result<T, InvalidCode>,
) -> Result<Vec<T>, CliError> {
    var(name)
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_code(name, s, parse))
        .collect()
}

/// `CODE=RATE` pairs, e.g. `FARE_RATES=GBP=0.85,PLN=4.3`.
fn parse_rates(name: &'static str) -> Result<Vec<(CurrencyCode, f64)>, CliError> {
    let bad = |message: String| CliError::Env { var: name, message };

    var(name)
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|pair| -> Result<(CurrencyCode, f64), CliError> {
            let (code, rate) = pair
                .split_once('=')
                .ok_or_else(|| bad(format!("expected CODE=RATE, got {pair:?}")))?;
            let code = parse_code(name, code, CurrencyCode::parse)?;
            let rate = rate.trim().parse::<f64>().map_err(|e| bad(e.to_string()))?;
            Ok((code, rate))
        })
        .collect()
}

fn start_of(name: &'static str, date: NaiveDate) -> Result<DateTime<Utc>, CliError> {
    date.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| CliError::Env {
            var: name,
            message: format!("invalid date {date}"),
        })
}

fn end_of(name: &'static str, date: NaiveDate) -> Result<DateTime<Utc>, CliError> {
    date.and_hms_opt(23, 59, 59)
        .map(|t| t.and_utc())
        .ok_or_else(|| CliError::Env {
            var: name,
            message: format!("invalid date {date}"),
        })
}

/// Everything the binary reads from the environment.
struct Settings {
    constraints: RouteConstraints,
    policy: RetryPolicy,
    base: CurrencyCode,
    market: String,
    offline: Option<Offline>,
}

/// Files searched instead of the live API.
#[derive(Debug, PartialEq)]
struct Offline {
    /// A `flight_info.json` dump.
    data: PathBuf,
    /// An airport listing for the dump, which names no cities or countries.
    airports: PathBuf,
}

impl Offline {
    fn from_paths(
        data: Option<PathBuf>,
        airports: Option<PathBuf>,
    ) -> Result<Option<Self>, CliError> {
        match (data, airports) {
            (Some(data), Some(airports)) => Ok(Some(Self { data, airports })),
            (Some(_), None) => Err(CliError::Env {
                var: "FARE_AIRPORTS",
                message: "required with FARE_DATA".to_string(),
            }),
            (None, _) => Ok(None),
        }
    }
}

impl Settings {
    fn from_env() -> Result<Self, CliError> {
        let root = var("FARE_ROOT").ok_or(CliError::Env {
            var: "FARE_ROOT",
            message: "not set".to_string(),
        })?;
        let root = parse_code("FARE_ROOT", &root, AirportCode::parse)?;

        let today = Utc::now().date_naive();
        let first = parse_var("FARE_NOT_BEFORE", today)?;
        let last = parse_var(
            "FARE_UNTIL",
            first + chrono::Duration::days(DEFAULT_WINDOW_DAYS),
        )?;

        let defaults = RouteConstraints::new(
            root,
            start_of("FARE_NOT_BEFORE", first)?,
            end_of("FARE_UNTIL", last)?,
        );

        let mut constraints = defaults
            .clone()
            .with_max_away_days(parse_var("FARE_MAX_AWAY_DAYS", defaults.max_away_days)?)
            .with_stay_days(
                parse_var("FARE_MIN_STAY_DAYS", defaults.min_stay_days)?,
                parse_var("FARE_MAX_STAY_DAYS", defaults.max_stay_days)?,
            )
            .with_unique_country(parse_var("FARE_UNIQUE_COUNTRY", false)?)
            .with_airport_whitelist(parse_list("FARE_AIRPORT_WHITELIST", AirportCode::parse)?)
            .with_airport_blacklist(parse_list("FARE_AIRPORT_BLACKLIST", AirportCode::parse)?)
            .with_country_whitelist(parse_list("FARE_COUNTRY_WHITELIST", CountryCode::parse)?)
            .with_country_blacklist(parse_list("FARE_COUNTRY_BLACKLIST", CountryCode::parse)?)
            .with_via(parse_list("FARE_VIA", AirportCode::parse)?)
            .with_max_routes(parse_var("FARE_MAX_ROUTES", defaults.max_routes)?)
            .with_max_waypoint_depth(parse_var(
                "FARE_WAYPOINT_DEPTH",
                defaults.max_waypoint_depth,
            )?);
        let budget_secs: u64 = parse_var("FARE_BUDGET_SECS", 0)?;
        if budget_secs > 0 {
            constraints = constraints.with_time_budget(Duration::from_secs(budget_secs));
        }

        let mut policy = RetryPolicy::default();
        let call_delay_ms: u64 = parse_var("FARE_CALL_DELAY_MS", 0)?;
        if call_delay_ms > 0 {
            policy = policy.with_call_delay(Duration::from_millis(call_delay_ms));
        }

        let base = var("FARE_BASE_CURRENCY").unwrap_or_else(|| "EUR".to_string());
        let base = parse_code("FARE_BASE_CURRENCY", &base, CurrencyCode::parse)?;

        Ok(Self {
            constraints,
            policy,
            base,
            market: var("FARE_MARKET").unwrap_or_else(|| "en-gb".to_string()),
            offline: Offline::from_paths(
                var("FARE_DATA").map(PathBuf::from),
                var("FARE_AIRPORTS").map(PathBuf::from),
            )?,
        })
    }
}

async fn search<S: FareSource, R: RateSource>(
    source: S,
    rates: R,
    settings: &Settings,
) -> Result<(), CliError> {
    let source = CachedFareSource::new(
        RetryingFareSource::new(source, settings.policy.clone()),
        &CacheConfig::default(),
    );

    let directory: AirportDirectory = source.airports().await?.into_iter().collect();
    info!(airports = directory.len(), "Loaded airport directory");

    let converter = CurrencyConverter::new(rates, settings.base, settings.policy.clone());
    let finder = RouteFinder::new(&source, &converter, &directory);
    let outcome = finder.search(&settings.constraints).await?;

    for (rank, route) in outcome.routes.iter().enumerate() {
        println!(
            "{:>3}. {} {}  {:.2}/leg  {} to {}",
            rank + 1,
            route,
            settings.base,
            route.average_cost(),
            route.departure().format("%Y-%m-%d %H:%M"),
            route.arrival().format("%Y-%m-%d %H:%M"),
        );
    }
    if outcome.routes.is_empty() {
        println!("No round trips found.");
    }

    Ok(())
}

async fn run() -> Result<(), CliError> {
    let settings = Settings::from_env()?;

    match &settings.offline {
        Some(offline) => {
            info!(path = %offline.data.display(), "Searching offline fare dump");
            let mut source = MockFareSource::from_json_file(&offline.data)?;
            let json = std::fs::read_to_string(&offline.airports).map_err(|source| CliError::Io {
                path: offline.airports.clone(),
                source,
            })?;
            source.load_airports_json(&json)?;

            // Offline: fixed exchange rates against the base currency
            let rates = parse_rates("FARE_RATES")?
                .into_iter()
                .fold(FixedRates::new(), |rates, (code, rate)| rates.with_rate(code, rate));
            search(source, rates, &settings).await
        }
        None => {
            let config = FareClientConfig::new().with_market(settings.market.clone());
            let client = FareClient::new(config)?;
            let rates = RateClient::new(RateClientConfig::default())?;
            search(client, rates, &settings).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fare-finder failed");
            ExitCode::FAILURE
        }
    }
}
