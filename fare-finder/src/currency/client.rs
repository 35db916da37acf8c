//! HTTP exchange-rate client.
//!
//! Fetches a base-currency rate table from an open exchange-rate API
//! (`GET {base_url}/{BASE}` returning `{"result": "success", "rates": {...}}`).

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::domain::CurrencyCode;
use crate::fares::FareError;

use super::converter::RateSource;

/// Default base URL for the rate API.
const DEFAULT_BASE_URL: &str = "https://open.er-api.com/v6/latest";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    result: Option<String>,
    rates: Option<HashMap<String, f64>>,
}

/// Configuration for the rate client.
#[derive(Debug, Clone)]
pub struct RateClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl RateClientConfig {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Default for RateClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Client for the exchange-rate API.
#[derive(Debug, Clone)]
pub struct RateClient {
    http: reqwest::Client,
    base_url: String,
}

impl RateClient {
    pub fn new(config: RateClientConfig) -> Result<Self, FareError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }
}

impl RateSource for RateClient {
    async fn rates(&self, base: CurrencyCode) -> Result<HashMap<CurrencyCode, f64>, FareError> {
        let url = format!("{}/{}", self.base_url, base);
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FareError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FareError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_rates(&body)
    }
}

/// Parse a rate table response, skipping codes that are not ISO 4217 shaped.
fn parse_rates(body: &str) -> Result<HashMap<CurrencyCode, f64>, FareError> {
    let response: RatesResponse = serde_json::from_str(body).map_err(|e| FareError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })?;

    if let Some(result) = response.result.as_deref() {
        if result != "success" {
            return Err(FareError::Api {
                status: 200,
                message: format!("rate API reported {result}"),
            });
        }
    }

    let rates = response.rates.ok_or_else(|| FareError::MissingField {
        field: "rates",
        context: "exchange rate response".to_string(),
    })?;

    let table: HashMap<CurrencyCode, f64> = rates
        .into_iter()
        .filter_map(|(code, rate)| CurrencyCode::parse(&code).ok().map(|c| (c, rate)))
        .collect();
    debug!(currencies = table.len(), "Parsed exchange rates");
    Ok(table)
}
