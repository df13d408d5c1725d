use crate::error::DataError;
use core_types::Holding;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

pub const TICKER_COLUMN: &str = "Ticker";
pub const SHARES_COLUMN: &str = "Shares";
pub const PURCHASE_PRICE_COLUMN: &str = "Purchase Price";

/// A holdings row that could not be turned into a `Holding`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// 1-based line number in the source file.
    pub line: u64,
    pub reason: String,
}

/// The result of reading a holdings file.
#[derive(Debug, Clone, Default)]
pub struct HoldingsLoad {
    pub holdings: Vec<Holding>,
    pub dropped: Vec<DroppedRow>,
    /// Whether the file carried a purchase-price column at all.
    pub has_purchase_price: bool,
}

/// Reads holdings from CSV with at least `Ticker` and `Shares` columns.
///
/// Header names are trimmed before matching. A missing required column fails
/// the whole load. Rows with an empty ticker or non-numeric or non-positive
/// shares are dropped and reported in `HoldingsLoad::dropped`.
pub fn load_holdings<R: Read>(reader: R) -> Result<HoldingsLoad, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = |name: &'static str| headers.iter().position(|h| h == name);

    let ticker_idx = column(TICKER_COLUMN).ok_or(DataError::MissingRequiredColumn {
        source_name: "holdings",
        column: TICKER_COLUMN,
    })?;
    let shares_idx = column(SHARES_COLUMN).ok_or(DataError::MissingRequiredColumn {
        source_name: "holdings",
        column: SHARES_COLUMN,
    })?;
    let purchase_idx = column(PURCHASE_PRICE_COLUMN);

    let mut load = HoldingsLoad {
        has_purchase_price: purchase_idx.is_some(),
        ..HoldingsLoad::default()
    };

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let shares = match parse_decimal(field(shares_idx)) {
            Some(shares) => shares,
            None => {
                drop_row(&mut load, line, format!("non-numeric shares '{}'", field(shares_idx)));
                continue;
            }
        };

        let purchase_price = purchase_idx.and_then(|idx| {
            let raw = field(idx);
            let parsed = parse_decimal(raw);
            if parsed.is_none() && !raw.is_empty() {
                tracing::warn!(line, value = raw, "Unreadable purchase price; gain will be omitted.");
            }
            parsed
        });

        match Holding::new(field(ticker_idx), shares, purchase_price) {
            Ok(holding) => load.holdings.push(holding),
            Err(e) => drop_row(&mut load, line, e.to_string()),
        }
    }

    tracing::info!(
        holdings = load.holdings.len(),
        dropped = load.dropped.len(),
        "Holdings loaded."
    );
    Ok(load)
}

fn drop_row(load: &mut HoldingsLoad, line: u64, reason: String) {
    tracing::warn!(line, %reason, "Holdings row dropped.");
    load.dropped.push(DroppedRow { line, reason });
}

/// Parses a numeric cell, tolerating a leading `$` and thousands separators.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}
