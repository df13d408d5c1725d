use core_types::{DatedValue, Holding, PriceSeries, ReturnSeries};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything one analysis run needs, already fetched by the I/O collaborators.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub holdings: Vec<Holding>,
    /// Most recent close per ticker. A ticker missing here is unresolvable.
    pub latest_prices: BTreeMap<String, Decimal>,
    /// Daily close history per ticker over the analysis window.
    pub histories: BTreeMap<String, PriceSeries>,
    pub benchmark: Option<PriceSeries>,
}

/// A data problem confined to one snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowDataError {
    /// The purchase price is zero, so a percentage gain cannot be computed.
    ZeroPurchasePrice,
}

/// One holding valued at its current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub ticker: String,
    pub shares: Decimal,
    pub purchase_price: Option<Decimal>,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub allocation_pct: Decimal,
    pub unrealized_gain_abs: Option<Decimal>,
    pub unrealized_gain_pct: Option<Decimal>,
    pub data_error: Option<RowDataError>,
}

/// The valued portfolio: priced rows plus the tickers that could not be priced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Rows in the same order as the input holdings.
    pub rows: Vec<PortfolioSnapshot>,
    /// Tickers without a resolvable price, in first-seen order.
    pub skipped_tickers: Vec<String>,
    pub total_market_value: Decimal,
}

impl Valuation {
    /// Allocation weights as fractions (allocation_pct / 100), keyed by ticker.
    ///
    /// Rows that share a ticker contribute a single combined weight.
    pub fn weights(&self) -> BTreeMap<String, Decimal> {
        let mut weights = BTreeMap::new();
        for row in &self.rows {
            *weights.entry(row.ticker.clone()).or_insert(Decimal::ZERO) +=
                row.allocation_pct / Decimal::ONE_HUNDRED;
        }
        weights
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Portfolio-level risk statistics.
///
/// `None` means the statistic is undefined for this run (too few aligned
/// observations, or a zero denominator). Each field is computed independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Annualized standard deviation of daily returns. Never negative.
    pub volatility: Option<Decimal>,
    pub sharpe: Option<Decimal>,
    /// Sensitivity to the benchmark.
    pub beta: Option<Decimal>,
    /// Worst peak-to-trough decline of the growth curve. Never positive.
    pub max_drawdown: Option<Decimal>,
}

/// Pairwise Pearson correlations of per-ticker daily returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    /// `values[i][j]` correlates `tickers[i]` with `tickers[j]`.
    pub values: Vec<Vec<Option<Decimal>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<Decimal> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        self.values[i][j]
    }
}

/// The complete result of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub valuation: Valuation,
    pub portfolio_returns: ReturnSeries,
    /// Growth of $1 invested in the weighted portfolio.
    pub portfolio_growth: Vec<DatedValue>,
    /// Growth of $1 invested in the benchmark. Empty without a benchmark.
    pub benchmark_growth: Vec<DatedValue>,
    pub correlation: CorrelationMatrix,
    pub risk: RiskReport,
}
