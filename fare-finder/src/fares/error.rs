//! Fare source error types.

use std::sync::Arc;

/// Errors from a fare source.
#[derive(Debug, thiserror::Error)]
pub enum FareError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Response parsed but lacked a field we rely on
    #[error("missing field {field} in {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },

    /// Field present but its value could not be interpreted
    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the API
    #[error("rate limited by fare source")]
    RateLimited,

    /// Credentials rejected or access blocked
    #[error("unauthorized")]
    Unauthorized,

    /// Source temporarily unreachable
    #[error("fare source unavailable: {0}")]
    Unavailable(String),

    /// Every attempt allowed by the retry policy failed
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: Box<FareError>,
    },

    /// Failure shared by every caller that waited on the same cached lookup
    #[error(transparent)]
    Shared(Arc<FareError>),
}
