//! Airport, city and country codes.

use std::fmt;

/// Error returned when parsing an invalid airport, country or city code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} code {input:?}: {reason}")]
pub struct InvalidCode {
    kind: &'static str,
    input: String,
    reason: &'static str,
}

impl InvalidCode {
    pub(crate) fn new(kind: &'static str, input: &str, reason: &'static str) -> Self {
        Self {
            kind,
            input: input.to_string(),
            reason,
        }
    }
}

/// A valid 3-letter IATA airport code.
///
/// IATA codes are always 3 uppercase ASCII letters. This type guarantees
/// that any `AirportCode` value is valid by construction.
///
/// # Examples
///
/// ```
/// use fare_finder::domain::AirportCode;
///
/// let stn = AirportCode::parse("STN").unwrap();
/// assert_eq!(stn.as_str(), "STN");
///
/// // Lowercase is rejected
/// assert!(AirportCode::parse("stn").is_err());
///
/// // Wrong length is rejected
/// assert!(AirportCode::parse("ST").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AirportCode([u8; 3]);

impl AirportCode {
    /// Parse an airport code from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidCode::new(
                "airport",
                s,
                "must be exactly 3 characters",
            ));
        }

        if !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(InvalidCode::new(
                "airport",
                s,
                "must be uppercase ASCII letters A-Z",
            ));
        }

        Ok(AirportCode([bytes[0], bytes[1], bytes[2]]))
    }

    /// Returns the airport code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII uppercase letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Debug for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AirportCode({})", self.as_str())
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 2-letter ISO country code, normalized to uppercase.
///
/// Fare sources report these in either case (`"ie"`, `"IE"`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Parse a country code, accepting either case.
    pub fn parse(s: &str) -> Result<Self, InvalidCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(InvalidCode::new(
                "country",
                s,
                "must be exactly 2 ASCII letters",
            ));
        }

        Ok(CountryCode([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
        ]))
    }

    /// Returns the country code as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Debug for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountryCode({})", self.as_str())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a metropolitan area served by one or more airports.
///
/// City codes are free-form (`"LONDON"`, `"MILAN"`), normalized to uppercase.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CityCode(String);

impl CityCode {
    /// Parse a city code. Surrounding whitespace is trimmed.
    pub fn parse(s: &str) -> Result<Self, InvalidCode> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidCode::new("city", s, "must not be empty"));
        }
        Ok(CityCode(trimmed.to_ascii_uppercase()))
    }

    /// The city of an airport that has no metropolitan grouping.
    pub fn of_airport(code: AirportCode) -> Self {
        CityCode(code.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CityCode({})", self.0)
    }
}

impl fmt::Display for CityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static metadata about one airport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Airport {
    pub code: AirportCode,
    pub name: String,
    pub city: CityCode,
    pub country: CountryCode,
}

impl Airport {
    pub fn new(
        code: AirportCode,
        name: impl Into<String>,
        city: CityCode,
        country: CountryCode,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            city,
            country,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Roundtrip: parse then as_str returns the original
        #[test]
        fn roundtrip(s in "[A-Z]{3}") {
            let code = AirportCode::parse(&s).unwrap();
            prop_assert_eq!(code.as_str(), s.as_str());
        }

        /// Lowercase letters are always rejected
        #[test]
        fn lowercase_rejected(s in "[a-z]{3}") {
            prop_assert!(AirportCode::parse(&s).is_err());
        }

        /// Wrong-length strings are always rejected
        #[test]
        fn wrong_length_rejected(s in "[A-Z]{0,2}|[A-Z]{4,10}") {
            prop_assert!(AirportCode::parse(&s).is_err());
        }
    }
}
