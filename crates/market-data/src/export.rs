use crate::error::DataError;
use analytics::Valuation;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One line of the downloadable portfolio summary.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Shares")]
    shares: Decimal,
    #[serde(rename = "Current Price")]
    current_price: Decimal,
    #[serde(rename = "Market Value")]
    market_value: Decimal,
    #[serde(rename = "Allocation %")]
    allocation_pct: Decimal,
}

/// Writes the snapshot table as CSV:
/// `Ticker,Shares,Current Price,Market Value,Allocation %`.
pub fn write_snapshot_csv<W: Write>(writer: W, valuation: &Valuation) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_writer(writer);

    if valuation.rows.is_empty() {
        // serialize() only emits headers alongside the first row
        writer.write_record([
            "Ticker",
            "Shares",
            "Current Price",
            "Market Value",
            "Allocation %",
        ])?;
    }

    for row in &valuation.rows {
        writer.serialize(SummaryRow {
            ticker: &row.ticker,
            shares: row.shares,
            current_price: row.current_price,
            market_value: row.market_value.round_dp(2).normalize(),
            allocation_pct: row.allocation_pct.round_dp(4).normalize(),
        })?;
    }

    writer.flush()?;
    Ok(())
}
