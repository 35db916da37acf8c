//! Exchange-rate lookup with a per-run cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::CurrencyCode;
use crate::fares::FareError;
use crate::retry::RetryPolicy;

/// Errors from currency conversion.
#[derive(Debug, thiserror::Error)]
pub enum CurrencyError {
    /// The rate table could not be fetched
    #[error("failed to fetch exchange rates: {0}")]
    Source(#[from] FareError),

    /// The rate table has no entry for this currency
    #[error("no exchange rate for {0}")]
    UnknownCurrency(CurrencyCode),

    /// The rate table has an unusable entry
    #[error("invalid exchange rate for {currency}: {rate}")]
    InvalidRate { currency: CurrencyCode, rate: f64 },
}

/// Source of a base-currency exchange-rate table.
#[allow(async_fn_in_trait)]
pub trait RateSource {
    /// Units of each currency per one unit of `base`.
    async fn rates(&self, base: CurrencyCode) -> Result<HashMap<CurrencyCode, f64>, FareError>;
}

/// A fixed rate table, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<CurrencyCode, f64>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, currency: CurrencyCode, rate: f64) -> Self {
        self.rates.insert(currency, rate);
        self
    }
}

impl RateSource for FixedRates {
    async fn rates(&self, _base: CurrencyCode) -> Result<HashMap<CurrencyCode, f64>, FareError> {
        Ok(self.rates.clone())
    }
}

/// Converts prices into the base currency.
///
/// The rate table is fetched on first use, under the retry policy, and kept
/// until [`CurrencyConverter::clear`] is called at the end of a run. The base
/// currency always converts at 1.
pub struct CurrencyConverter<R> {
    source: R,
    base: CurrencyCode,
    policy: RetryPolicy,
    table: Mutex<Option<Arc<HashMap<CurrencyCode, f64>>>>,
}

impl<R: RateSource> CurrencyConverter<R> {
    pub fn new(source: R, base: CurrencyCode, policy: RetryPolicy) -> Self {
        Self {
            source,
            base,
            policy,
            table: Mutex::new(None),
        }
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// The current rate table. Callers waiting on the same fetch share it.
    async fn table(&self) -> Result<Arc<HashMap<CurrencyCode, f64>>, FareError> {
        let mut table = self.table.lock().await;
        if let Some(table) = table.as_ref() {
            return Ok(Arc::clone(table));
        }

        let operation = format!("exchange rates {}", self.base);
        let fetched = self
            .policy
            .run(&operation, || self.source.rates(self.base))
            .await?;
        debug!(base = %self.base, currencies = fetched.len(), "Loaded exchange rates");

        let fetched = Arc::new(fetched);
        *table = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Forget the rate table; the next lookup fetches a fresh one.
    pub async fn clear(&self) {
        *self.table.lock().await = None;
    }

    /// Units of `currency` per one unit of the base currency.
    pub async fn exchange_rate(&self, currency: CurrencyCode) -> Result<f64, CurrencyError> {
        if currency == self.base {
            return Ok(1.0);
        }

        let rate = *self
            .table()
            .await?
            .get(&currency)
            .ok_or(CurrencyError::UnknownCurrency(currency))?;

        if !rate.is_finite() || rate <= 0.0 {
            return Err(CurrencyError::InvalidRate { currency, rate });
        }
        Ok(rate)
    }

    /// Convert `amount` of `currency` into the base currency.
    pub async fn to_base(&self, amount: f64, currency: CurrencyCode) -> Result<f64, CurrencyError> {
        Ok(amount / self.exchange_rate(currency).await?)
    }
}
