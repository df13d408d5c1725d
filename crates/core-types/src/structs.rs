use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single observation in a daily time series.
pub type DatedValue = (NaiveDate, Decimal);

/// A date-ordered series of fractional daily changes (0.01 == +1%).
pub type ReturnSeries = Vec<DatedValue>;

/// Normalizes a raw ticker symbol: surrounding whitespace removed, upper-cased.
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A position in the portfolio as supplied by the holdings source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub shares: Decimal,
    /// The per-share cost basis, if the source provided one.
    pub purchase_price: Option<Decimal>,
}

impl Holding {
    /// Builds a validated holding.
    ///
    /// The ticker is normalized before validation. A zero purchase price is
    /// accepted here; the valuation step reports it as a row-level data error.
    pub fn new(
        ticker: &str,
        shares: Decimal,
        purchase_price: Option<Decimal>,
    ) -> Result<Self, CoreError> {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(CoreError::InvalidInput(
                "ticker".to_string(),
                "ticker must not be empty".to_string(),
            ));
        }
        if shares <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "shares".to_string(),
                format!("{ticker}: shares must be positive, got {shares}"),
            ));
        }
        if let Some(price) = purchase_price {
            if price < Decimal::ZERO {
                return Err(CoreError::InvalidInput(
                    "purchase_price".to_string(),
                    format!("{ticker}: purchase price cannot be negative, got {price}"),
                ));
            }
        }

        Ok(Self {
            ticker,
            shares,
            purchase_price,
        })
    }
}

/// Daily closing prices for one ticker, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    points: Vec<DatedValue>,
}

impl PriceSeries {
    pub fn new(ticker: &str, points: Vec<DatedValue>) -> Result<Self, CoreError> {
        let ticker = normalize_ticker(ticker);
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(CoreError::InvalidInput(
                "price_series".to_string(),
                format!(
                    "{ticker}: dates must be strictly increasing ({} is followed by {})",
                    w[0].0, w[1].0
                ),
            ));
        }
        Ok(Self { ticker, points })
    }

    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent close in the series.
    pub fn last_close(&self) -> Option<Decimal> {
        self.points.last().map(|&(_, close)| close)
    }

    /// The most recent close on or before `as_of`.
    pub fn close_as_of(&self, as_of: NaiveDate) -> Option<Decimal> {
        self.points
            .iter()
            .rev()
            .find(|(date, _)| *date <= as_of)
            .map(|&(_, close)| close)
    }

    /// Returns the sub-series with dates in `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|(date, _)| *date >= start && *date <= end)
                .copied()
                .collect(),
        }
    }
}
