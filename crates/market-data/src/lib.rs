//! # Market Data
//!
//! The I/O collaborators of the analyzer: reading the holdings file, serving
//! daily closes through the `PriceSource` interface, and exporting the
//! snapshot table. Everything here produces fully materialized values; the
//! analytics engine never touches a file.

use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::PriceSeries;
use rust_decimal::Decimal;

pub mod csv_source;
pub mod error;
pub mod export;
pub mod holdings;

// --- Public API ---
pub use csv_source::CsvPriceSource;
pub use error::DataError;
pub use export::write_snapshot_csv;
pub use holdings::{DroppedRow, HoldingsLoad, load_holdings};

/// The generic, abstract interface for a source of daily closing prices.
/// The analyzer depends only on this trait, allowing a file-backed or a
/// network-backed implementation to be swapped in.
///
/// An unknown ticker is `Ok(None)`, never an error, so that one bad symbol
/// cannot fail the whole run.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// The most recent close on or before `as_of`.
    async fn latest_close(&self, ticker: &str, as_of: NaiveDate)
    -> Result<Option<Decimal>, DataError>;

    /// All daily closes with dates in `[start, end]`, or `None` if there are none.
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>, DataError>;
}
