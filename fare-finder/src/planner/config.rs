//! Route constraints for the fare search.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{AirportCode, AirportDirectory, CountryCode};

/// Errors from validating [`RouteConstraints`] against the airport directory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown airport: {0}")]
    UnknownAirport(AirportCode),

    #[error("unknown country: {0}")]
    UnknownCountry(CountryCode),

    #[error("search window is empty: {not_before} is after {until}")]
    EmptyWindow {
        not_before: DateTime<Utc>,
        until: DateTime<Utc>,
    },

    #[error("invalid stay: min {min} days, max {max} days")]
    InvalidStay { min: i64, max: i64 },

    #[error("trip length must be positive, got {0} days")]
    InvalidTripLength(i64),

    #[error("max routes must be at least one")]
    ZeroMaxRoutes,

    #[error("waypoints must not include the root airport {0}")]
    ViaContainsRoot(AirportCode),

    #[error("waypoint {0} listed more than once")]
    DuplicateVia(AirportCode),

    #[error("root airport {0} is blacklisted")]
    RootBlacklisted(AirportCode),
}

/// Constraints on the itineraries a search may return.
#[derive(Debug, Clone)]
pub struct RouteConstraints {
    /// Airport every route starts from and returns to.
    pub root: AirportCode,

    /// Earliest first departure.
    pub not_before: DateTime<Utc>,

    /// Latest first departure.
    pub until: DateTime<Utc>,

    /// Longest trip, from first departure to last arrival (days).
    pub max_away_days: i64,

    /// Shortest stay between consecutive legs (days).
    pub min_stay_days: i64,

    /// Longest stay between consecutive legs (days).
    pub max_stay_days: i64,

    /// Visit each country at most once (the root's country counts as visited).
    pub unique_country: bool,

    /// When non-empty, only these airports may be visited.
    pub airport_whitelist: BTreeSet<AirportCode>,

    pub airport_blacklist: BTreeSet<AirportCode>,

    /// When non-empty, only airports in these countries may be visited.
    pub country_whitelist: BTreeSet<CountryCode>,

    pub country_blacklist: BTreeSet<CountryCode>,

    /// Airports every route must pass through, in any order.
    pub via: Vec<AirportCode>,

    /// Stop once this many distinct city sets have a closed route.
    pub max_routes: usize,

    /// Stop once the search has run this long.
    pub time_budget: Option<StdDuration>,

    /// Deepest hop count tried when connecting two waypoints.
    pub max_waypoint_depth: usize,
}

impl RouteConstraints {
    /// Constraints for round trips from `root` departing within
    /// `[not_before, until]`, with default stays and limits.
    pub fn new(root: AirportCode, not_before: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            root,
            not_before,
            until,
            max_away_days: 14,
            min_stay_days: 1,
            max_stay_days: 5,
            unique_country: false,
            airport_whitelist: BTreeSet::new(),
            airport_blacklist: BTreeSet::new(),
            country_whitelist: BTreeSet::new(),
            country_blacklist: BTreeSet::new(),
            via: Vec::new(),
            max_routes: 100,
            time_budget: None,
            max_waypoint_depth: 3,
        }
    }

    pub fn with_max_away_days(mut self, days: i64) -> Self {
        self.max_away_days = days;
        self
    }

    pub fn with_stay_days(mut self, min: i64, max: i64) -> Self {
        self.min_stay_days = min;
        self.max_stay_days = max;
        self
    }

    pub fn with_unique_country(mut self, unique: bool) -> Self {
        self.unique_country = unique;
        self
    }

    pub fn with_airport_whitelist(mut self, airports: impl IntoIterator<Item = AirportCode>) -> Self {
        self.airport_whitelist = airports.into_iter().collect();
        self
    }

    pub fn with_airport_blacklist(mut self, airports: impl IntoIterator<Item = AirportCode>) -> Self {
        self.airport_blacklist = airports.into_iter().collect();
        self
    }

    pub fn with_country_whitelist(
        mut self,
        countries: impl IntoIterator<Item = CountryCode>,
    ) -> Self {
        self.country_whitelist = countries.into_iter().collect();
        self
    }

    pub fn with_country_blacklist(
        mut self,
        countries: impl IntoIterator<Item = CountryCode>,
    ) -> Self {
        self.country_blacklist = countries.into_iter().collect();
        self
    }

    pub fn with_via(mut self, via: impl IntoIterator<Item = AirportCode>) -> Self {
        self.via = via.into_iter().collect();
        self
    }

    pub fn with_max_routes(mut self, n: usize) -> Self {
        self.max_routes = n;
        self
    }

    pub fn with_time_budget(mut self, budget: StdDuration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_max_waypoint_depth(mut self, depth: usize) -> Self {
        self.max_waypoint_depth = depth;
        self
    }

    pub fn max_away(&self) -> Duration {
        Duration::days(self.max_away_days)
    }

    pub fn min_stay(&self) -> Duration {
        Duration::days(self.min_stay_days)
    }

    pub fn max_stay(&self) -> Duration {
        Duration::days(self.max_stay_days)
    }

    /// Check the constraints before any fare is fetched.
    pub fn validate(&self, directory: &AirportDirectory) -> Result<(), ConfigError> {
        let known_airport = |code: &AirportCode| {
            if directory.contains(code) {
                Ok(())
            } else {
                Err(ConfigError::UnknownAirport(*code))
            }
        };
        let known_country = |code: &CountryCode| {
            if directory.knows_country(code) {
                Ok(())
            } else {
                Err(ConfigError::UnknownCountry(*code))
            }
        };

        known_airport(&self.root)?;

        if self.not_before > self.until {
            return Err(ConfigError::EmptyWindow {
                not_before: self.not_before,
                until: self.until,
            });
        }
        if self.max_away_days <= 0 {
            return Err(ConfigError::InvalidTripLength(self.max_away_days));
        }
        if self.min_stay_days < 0 || self.min_stay_days > self.max_stay_days {
            return Err(ConfigError::InvalidStay {
                min: self.min_stay_days,
                max: self.max_stay_days,
            });
        }
        if self.max_routes == 0 {
            return Err(ConfigError::ZeroMaxRoutes);
        }

        let mut seen = HashSet::new();
        for via in &self.via {
            known_airport(via)?;
            if *via == self.root {
                return Err(ConfigError::ViaContainsRoot(*via));
            }
            if !seen.insert(*via) {
                return Err(ConfigError::DuplicateVia(*via));
            }
        }

        for code in self.airport_whitelist.iter().chain(&self.airport_blacklist) {
            known_airport(code)?;
        }
        for code in self.country_whitelist.iter().chain(&self.country_blacklist) {
            known_country(code)?;
        }

        if self.airport_blacklist.contains(&self.root) {
            return Err(ConfigError::RootBlacklisted(self.root));
        }

        Ok(())
    }
}
