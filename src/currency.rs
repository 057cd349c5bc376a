//! Currency conversion backed by an exchange-rate lookup.
//!
//! Rates are expressed as units of each currency per US dollar. The remote
//! source is consulted at most once per TTL window; any failure is logged and
//! replaced by fixed fallback rates so callers never see an error.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::model::label::labelled_enum;

pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";
pub const DEFAULT_RATES_TTL: Duration = Duration::from_secs(5 * 60);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

labelled_enum! {
    /// Currencies a project's values can be recorded in.
    Currency as "currency" {
        Usd => "USD" | "dollar" | "us$" | "$",
        Brl => "BRL" | "real" | "reais" | "r$",
        Eur => "EUR" | "euro" | "€",
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Brl
    }
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "US$",
            Currency::Brl => "R$",
            Currency::Eur => "€",
        }
    }

    fn fallback_rate(self) -> f64 {
        match self {
            Currency::Usd => 1.0,
            Currency::Brl => 5.0,
            Currency::Eur => 0.85,
        }
    }
}

#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("rate request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate response is missing {0}")]
    MissingRate(Currency),
    #[error("rate for {currency} is not a positive number: {value}")]
    InvalidRate { currency: Currency, value: f64 },
}

/// Units of each currency per US dollar.
#[derive(Debug, Clone, PartialEq)]
pub struct Rates(HashMap<Currency, f64>);

impl Rates {
    pub fn fallback() -> Self {
        Self(
            Currency::ALL
                .iter()
                .map(|&c| (c, c.fallback_rate()))
                .collect(),
        )
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Currency, f64)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Rate for `currency`, falling back to the fixed table when absent or unusable.
    pub fn rate(&self, currency: Currency) -> f64 {
        match self.0.get(&currency) {
            Some(&rate) if rate.is_finite() && rate > 0.0 => rate,
            _ => currency.fallback_rate(),
        }
    }

    /// Convert `amount`, rounded to cents.
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        if from == to {
            return round_cents(amount);
        }
        round_cents(amount / self.rate(from) * self.rate(to))
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render an amount with its currency symbol, e.g. `R$ 1234.50`.
pub fn format_amount(amount: f64, currency: Currency) -> String {
    format!("{} {:.2}", currency.symbol(), amount)
}

/// Somewhere exchange rates can be fetched from.
pub trait RateSource {
    fn fetch(&self) -> Result<Rates, CurrencyError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Fetches rates from a JSON endpoint shaped like `{"rates": {"BRL": 5.1, ...}}`.
pub struct HttpRateSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpRateSource {
    pub fn new(url: impl Into<String>) -> Result<Self, CurrencyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl RateSource for HttpRateSource {
    fn fetch(&self) -> Result<Rates, CurrencyError> {
        let body: RatesResponse = self
            .client
            .get(&self.url)
            .send()?
            .error_for_status()?
            .json()?;

        let mut rates = HashMap::new();
        for &currency in Currency::ALL {
            let value = *body
                .rates
                .get(currency.label())
                .ok_or(CurrencyError::MissingRate(currency))?;
            if !(value.is_finite() && value > 0.0) {
                return Err(CurrencyError::InvalidRate { currency, value });
            }
            rates.insert(currency, value);
        }
        Ok(Rates(rates))
    }
}

/// Fixed rates; used when the network lookup is disabled and in tests.
pub struct StaticRateSource(pub Rates);

impl RateSource for StaticRateSource {
    fn fetch(&self) -> Result<Rates, CurrencyError> {
        Ok(self.0.clone())
    }
}

fn fetch_or_fallback(source: &dyn RateSource) -> Rates {
    match source.fetch() {
        Ok(rates) => {
            debug!("exchange rates refreshed");
            rates
        }
        Err(err) => {
            warn!("exchange rate lookup failed, using fallback rates: {err}");
            Rates::fallback()
        }
    }
}

/// Caches rates from a [`RateSource`] for a fixed TTL.
pub struct CurrencyConverter {
    source: Box<dyn RateSource>,
    ttl: Duration,
    cached: Option<(Instant, Rates)>,
}

impl CurrencyConverter {
    pub fn new(source: Box<dyn RateSource>) -> Self {
        Self::with_ttl(source, DEFAULT_RATES_TTL)
    }

    pub fn with_ttl(source: Box<dyn RateSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: None,
        }
    }

    /// Current rates. A failed lookup yields the fallback table, which is
    /// cached for the rest of the window like a successful one.
    pub fn rates(&mut self) -> &Rates {
        let stale = match &self.cached {
            Some((fetched_at, _)) => fetched_at.elapsed() >= self.ttl,
            None => true,
        };
        if stale {
            self.cached = None;
        }
        let source = &self.source;
        let (_, rates) = self
            .cached
            .get_or_insert_with(|| (Instant::now(), fetch_or_fallback(source.as_ref())));
        rates
    }

    pub fn convert(&mut self, amount: f64, from: Currency, to: Currency) -> f64 {
        self.rates().convert(amount, from, to)
    }
}
