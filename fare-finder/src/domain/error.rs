//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! in the domain layer. They are distinct from API/IO errors.

use super::AirportCode;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Fare lands where it took off
    #[error("flight from {0} to itself")]
    SelfLoop(AirportCode),

    /// Arrival is not after departure
    #[error("flight {origin}->{destination} arrives before it departs")]
    ArrivesBeforeDeparture {
        origin: AirportCode,
        destination: AirportCode,
    },

    /// Amount is zero, negative, NaN or infinite
    #[error("invalid price amount: {0}")]
    InvalidAmount(f64),

    /// Exchange rate is zero, negative or not finite
    #[error("invalid exchange rate: {0}")]
    InvalidRate(f64),

    /// Route has no legs
    #[error("route must have at least one leg")]
    EmptyRoute,

    /// Consecutive legs don't share a city
    #[error("legs do not connect: arrived at {arrived}, next leg departs {departs}")]
    Disconnected {
        arrived: AirportCode,
        departs: AirportCode,
    },

    /// Closed route doesn't return to its root
    #[error("route ends at {actual}, expected {expected}")]
    NotClosed {
        expected: AirportCode,
        actual: AirportCode,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let stn = AirportCode::parse("STN").unwrap();
        let dub = AirportCode::parse("DUB").unwrap();

        assert_eq!(DomainError::SelfLoop(stn).to_string(), "flight from STN to itself");
        assert_eq!(
            DomainError::EmptyRoute.to_string(),
            "route must have at least one leg"
        );
        assert_eq!(
            DomainError::Disconnected {
                arrived: stn,
                departs: dub
            }
            .to_string(),
            "legs do not connect: arrived at STN, next leg departs DUB"
        );
        assert_eq!(
            DomainError::NotClosed {
                expected: stn,
                actual: dub
            }
            .to_string(),
            "route ends at DUB, expected STN"
        );
    }
}
