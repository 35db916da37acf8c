//! Airport metadata lookup.
//!
//! Maps airport codes to their city and country, and groups airports of the
//! same metropolitan area. Airports missing from the directory are treated
//! as a city of their own with no known country.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::{Airport, AirportCode, CityCode, CountryCode};

#[derive(Debug, Clone, Default)]
pub struct AirportDirectory {
    airports: HashMap<AirportCode, Airport>,
    cities: HashMap<CityCode, BTreeSet<AirportCode>>,
    countries: HashSet<CountryCode>,
}

impl AirportDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an airport, replacing any previous entry for the same code.
    pub fn insert(&mut self, airport: Airport) {
        if let Some(previous) = self.airports.remove(&airport.code) {
            if let Some(group) = self.cities.get_mut(&previous.city) {
                group.remove(&previous.code);
            }
        }

        self.cities
            .entry(airport.city.clone())
            .or_default()
            .insert(airport.code);
        self.countries.insert(airport.country);
        self.airports.insert(airport.code, airport);
    }

    pub fn get(&self, code: &AirportCode) -> Option<&Airport> {
        self.airports.get(code)
    }

    pub fn contains(&self, code: &AirportCode) -> bool {
        self.airports.contains_key(code)
    }

    /// Whether any known airport lies in this country.
    pub fn knows_country(&self, country: &CountryCode) -> bool {
        self.countries.contains(country)
    }

    pub fn city_of(&self, code: AirportCode) -> CityCode {
        self.airports
            .get(&code)
            .map(|a| a.city.clone())
            .unwrap_or_else(|| CityCode::of_airport(code))
    }

    pub fn country_of(&self, code: AirportCode) -> Option<CountryCode> {
        self.airports.get(&code).map(|a| a.country)
    }

    /// Whether two airports serve the same city.
    pub fn same_city(&self, a: AirportCode, b: AirportCode) -> bool {
        a == b || self.city_of(a) == self.city_of(b)
    }

    /// All airports serving the city of `code`, including `code` itself,
    /// in code order.
    pub fn city_group(&self, code: AirportCode) -> Vec<AirportCode> {
        match self.airports.get(&code) {
            Some(airport) => self
                .cities
                .get(&airport.city)
                .map(|group| group.iter().copied().collect())
                .unwrap_or_else(|| vec![code]),
            None => vec![code],
        }
    }

    /// Every known airport, in no particular order.
    pub fn airports(&self) -> impl Iterator<Item = &Airport> {
        self.airports.values()
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

impl FromIterator<Airport> for AirportDirectory {
    fn from_iter<I: IntoIterator<Item = Airport>>(iter: I) -> Self {
        let mut directory = Self::new();
        for airport in iter {
            directory.insert(airport);
        }
        directory
    }
}
