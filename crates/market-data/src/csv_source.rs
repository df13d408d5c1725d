//! File-based price source.

use crate::PriceSource;
use crate::error::DataError;
use crate::holdings::parse_decimal;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{PriceSeries, normalize_ticker};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

pub const DATE_COLUMN: &str = "Date";
pub const TICKER_COLUMN: &str = "Ticker";
pub const CLOSE_COLUMN: &str = "Close";

/// CSV record for one daily close.
#[derive(Debug, Deserialize)]
struct CloseRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Close")]
    close: String,
}

/// Serves daily closes from a long-format CSV (`Date,Ticker,Close`).
///
/// The whole file is loaded once. Blank or non-numeric closes are treated as
/// missing days; if a ticker repeats a date, the later row wins.
#[derive(Debug, Clone, Default)]
pub struct CsvPriceSource {
    series: BTreeMap<String, PriceSeries>,
}

impl CsvPriceSource {
    /// Loads the price file at `path` without blocking the runtime.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_reader(bytes.as_slice())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        for column in [DATE_COLUMN, TICKER_COLUMN, CLOSE_COLUMN] {
            if !headers.iter().any(|h| h == column) {
                return Err(DataError::MissingRequiredColumn {
                    source_name: "prices",
                    column,
                });
            }
        }

        let mut closes: BTreeMap<String, BTreeMap<NaiveDate, Decimal>> = BTreeMap::new();
        let mut missing = 0usize;

        for result in reader.records() {
            let raw = result?;
            let line = raw.position().map(|p| p.line()).unwrap_or_default();
            let record: CloseRecord = raw.deserialize(Some(&headers))?;
            let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(|e| {
                DataError::InvalidData {
                    line,
                    message: format!("bad date '{}': {e}", record.date),
                }
            })?;
            let ticker = normalize_ticker(&record.ticker);
            if ticker.is_empty() {
                missing += 1;
                continue;
            }
            match parse_decimal(&record.close) {
                Some(close) => {
                    closes.entry(ticker).or_default().insert(date, close);
                }
                None => missing += 1,
            }
        }

        if missing > 0 {
            tracing::debug!(missing, "Price rows without a usable close were skipped.");
        }

        let series = closes
            .into_iter()
            .map(|(ticker, points)| {
                let series = PriceSeries::new(&ticker, points.into_iter().collect())?;
                Ok((ticker, series))
            })
            .collect::<Result<BTreeMap<_, _>, DataError>>()?;

        tracing::info!(tickers = series.len(), "Price file loaded.");
        Ok(Self { series })
    }

    /// Tickers with at least one close.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn latest_close(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Decimal>, DataError> {
        Ok(self
            .series
            .get(&normalize_ticker(ticker))
            .and_then(|series| series.close_as_of(as_of)))
    }

    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>, DataError> {
        Ok(self
            .series
            .get(&normalize_ticker(ticker))
            .map(|series| series.between(start, end))
            .filter(|series| !series.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PRICES: &str = "\
Date,Ticker,Close
2024-01-02,aapl,185.64
2024-01-02,MSFT,370.87
2024-01-03,AAPL,184.25
2024-01-03,MSFT,
2024-01-04,AAPL,181.91
2024-01-04,MSFT,367.94
2024-01-04,AAPL,182.00
";

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn serves_history_within_window() {
        let source = CsvPriceSource::from_reader(PRICES.as_bytes()).unwrap();

        let aapl = source.daily_closes("AAPL", d(1), d(31)).await.unwrap().unwrap();
        assert_eq!(
            aapl.points(),
            &[(d(2), dec!(185.64)), (d(3), dec!(184.25)), (d(4), dec!(182.00))]
        );

        let msft = source.daily_closes("msft", d(3), d(4)).await.unwrap().unwrap();
        assert_eq!(msft.points(), &[(d(4), dec!(367.94))]);
    }

    #[tokio::test]
    async fn latest_close_respects_as_of() {
        let source = CsvPriceSource::from_reader(PRICES.as_bytes()).unwrap();

        assert_eq!(source.latest_close("AAPL", d(3)).await.unwrap(), Some(dec!(184.25)));
        assert_eq!(source.latest_close("MSFT", d(3)).await.unwrap(), Some(dec!(370.87)));
        assert_eq!(source.latest_close("AAPL", d(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_ticker_is_absent_not_an_error() {
        let source = CsvPriceSource::from_reader(PRICES.as_bytes()).unwrap();

        assert_eq!(source.latest_close("ZZZZ", d(4)).await.unwrap(), None);
        assert!(source.daily_closes("ZZZZ", d(1), d(4)).await.unwrap().is_none());
        assert_eq!(source.tickers().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn missing_close_column_is_rejected() {
        let err = CsvPriceSource::from_reader("Date,Ticker,Price\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingRequiredColumn { column: "Close", .. }
        ));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = CsvPriceSource::from_reader("Date,Ticker,Close\n01/02/2024,AAPL,1\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidData { line: 2, .. }));
    }
}
