use crate::error::AnalyticsError;
use crate::report::{
    AnalysisInput, CorrelationMatrix, PortfolioAnalysis, PortfolioSnapshot, RiskReport,
    RowDataError, Valuation,
};
use crate::stats;
use configuration::AnalysisSettings;
use core_types::{DatedValue, Holding, ReturnSeries};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Tolerance applied when checking that allocation weights do not exceed 1.
const WEIGHT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// A stateless calculator for portfolio valuation, return series and risk metrics.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point: runs the whole pipeline for one set of inputs.
    ///
    /// # Arguments
    ///
    /// * `input` - Holdings and the prices fetched for them.
    /// * `settings` - Risk-free rate and annualization factor for this run.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PortfolioAnalysis` or an `AnalyticsError`.
    /// Unpriced holdings and undefined statistics are reported inside the
    /// analysis; only invalid settings or weights, or values outside Decimal's
    /// range, abort the run.
    pub fn analyze(
        &self,
        input: &AnalysisInput,
        settings: &AnalysisSettings,
    ) -> Result<PortfolioAnalysis, AnalyticsError> {
        if settings.trading_days_per_year == 0 {
            return Err(AnalyticsError::InvalidInput(
                "trading_days_per_year must be greater than 0".to_string(),
            ));
        }

        let valuation = self.resolve_snapshot(&input.holdings, &input.latest_prices)?;
        let weights = valuation.weights();

        let mut per_ticker_returns = BTreeMap::new();
        for ticker in weights.keys() {
            match input.histories.get(ticker) {
                Some(series) => {
                    per_ticker_returns.insert(ticker.clone(), self.daily_returns(series.points()));
                }
                None => tracing::debug!(%ticker, "No price history; ticker left out of return series."),
            }
        }

        let portfolio_returns = self.weighted_portfolio_returns(&per_ticker_returns, &weights)?;
        let portfolio_growth = self.cumulative_growth(&portfolio_returns)?;

        let benchmark_returns = input
            .benchmark
            .as_ref()
            .map(|series| self.daily_returns(series.points()));
        let benchmark_growth = match benchmark_returns.as_deref() {
            Some(returns) => self.cumulative_growth(returns)?,
            None => Vec::new(),
        };

        let correlation = self.correlation_matrix(&per_ticker_returns);
        let risk = self.risk_report(
            &portfolio_returns,
            benchmark_returns.as_deref(),
            settings.risk_free_rate,
            settings.trading_days_per_year,
        );

        tracing::info!(
            holdings = valuation.rows.len(),
            skipped = valuation.skipped_tickers.len(),
            return_days = portfolio_returns.len(),
            "Portfolio analysis complete."
        );

        Ok(PortfolioAnalysis {
            valuation,
            portfolio_returns,
            portfolio_growth,
            benchmark_growth,
            correlation,
            risk,
        })
    }

    /// Values every holding at its latest price and computes allocations.
    ///
    /// Holdings whose ticker has no price are left out of the rows and listed
    /// in `skipped_tickers`. If the priced holdings are worth nothing in total,
    /// allocations are undefined and no rows are returned. A position too large
    /// to value in Decimal is a `Calculation` error.
    pub fn resolve_snapshot(
        &self,
        holdings: &[Holding],
        latest_prices: &BTreeMap<String, Decimal>,
    ) -> Result<Valuation, AnalyticsError> {
        let mut skipped_tickers: Vec<String> = Vec::new();
        let mut priced: Vec<(&Holding, Decimal, Decimal)> = Vec::with_capacity(holdings.len());

        for holding in holdings {
            match latest_prices.get(&holding.ticker) {
                Some(&price) => {
                    let market_value = holding.shares.checked_mul(price).ok_or_else(|| {
                        AnalyticsError::Calculation(format!(
                            "market value of {} ({} x {price}) is out of range",
                            holding.ticker, holding.shares
                        ))
                    })?;
                    priced.push((holding, price, market_value));
                }
                None => {
                    tracing::warn!(ticker = %holding.ticker, "No price available; holding skipped.");
                    if !skipped_tickers.contains(&holding.ticker) {
                        skipped_tickers.push(holding.ticker.clone());
                    }
                }
            }
        }

        let total_market_value = stats::checked_sum(
            priced.iter().map(|&(_, _, market_value)| market_value),
            "total market value",
        )?;

        if total_market_value.is_zero() {
            if !priced.is_empty() {
                tracing::warn!("Total market value is zero; allocations are undefined.");
            }
            return Ok(Valuation {
                rows: Vec::new(),
                skipped_tickers,
                total_market_value,
            });
        }

        let rows = priced
            .into_iter()
            .map(|(holding, current_price, market_value)| {
                let mut row = PortfolioSnapshot {
                    ticker: holding.ticker.clone(),
                    shares: holding.shares,
                    purchase_price: holding.purchase_price,
                    current_price,
                    market_value,
                    allocation_pct: market_value / total_market_value * Decimal::ONE_HUNDRED,
                    unrealized_gain_abs: None,
                    unrealized_gain_pct: None,
                    data_error: None,
                };

                if let Some(purchase) = holding.purchase_price {
                    let gain_per_share = current_price - purchase;
                    let gain = gain_per_share.checked_mul(holding.shares).ok_or_else(|| {
                        AnalyticsError::Calculation(format!(
                            "unrealized gain of {} is out of range",
                            holding.ticker
                        ))
                    })?;
                    row.unrealized_gain_abs = Some(gain);
                    if purchase.is_zero() {
                        tracing::warn!(ticker = %holding.ticker, "Purchase price is zero; gain % is undefined.");
                        row.data_error = Some(RowDataError::ZeroPurchasePrice);
                    } else {
                        row.unrealized_gain_pct =
                            Some(gain_per_share / purchase * Decimal::ONE_HUNDRED);
                    }
                }

                Ok(row)
            })
            .collect::<Result<Vec<_>, AnalyticsError>>()?;

        Ok(Valuation {
            rows,
            skipped_tickers,
            total_market_value,
        })
    }

    /// Fractional day-over-day changes of a date-ordered price series.
    ///
    /// The first date has no return, so the result is one shorter than the
    /// input; fewer than two prices give an empty series.
    pub fn daily_returns(&self, prices: &[DatedValue]) -> ReturnSeries {
        prices
            .windows(2)
            .filter_map(|w| {
                let (_, previous) = w[0];
                let (date, close) = w[1];
                if previous.is_zero() {
                    tracing::debug!(%date, "Previous close is zero; no return for this date.");
                    return None;
                }
                let change = close
                    .checked_div(previous)
                    .and_then(|ratio| ratio.checked_sub(Decimal::ONE));
                if change.is_none() {
                    tracing::debug!(%date, "Return is out of range; no return for this date.");
                }
                change.map(|r| (date, r))
            })
            .collect()
    }

    /// Combines per-ticker returns into one weighted portfolio series.
    ///
    /// Only dates present in every contributing ticker's series are kept.
    /// Tickers without a weight do not contribute at all.
    pub fn weighted_portfolio_returns(
        &self,
        per_ticker_returns: &BTreeMap<String, ReturnSeries>,
        weights: &BTreeMap<String, Decimal>,
    ) -> Result<ReturnSeries, AnalyticsError> {
        if let Some((ticker, weight)) = weights
            .iter()
            .find(|&(_, w)| *w < Decimal::ZERO || *w > Decimal::ONE)
        {
            return Err(AnalyticsError::InvalidInput(format!(
                "weight for {ticker} must lie in [0, 1], got {weight}"
            )));
        }
        let total_weight: Decimal = weights.values().sum();
        if total_weight > Decimal::ONE + WEIGHT_TOLERANCE {
            return Err(AnalyticsError::InvalidInput(format!(
                "weights must sum to at most 1, got {total_weight}"
            )));
        }

        let contributing: Vec<(Decimal, BTreeMap<NaiveDate, Decimal>)> = weights
            .iter()
            .filter_map(|(ticker, &weight)| match per_ticker_returns.get(ticker) {
                Some(series) => Some((weight, series.iter().copied().collect())),
                None => {
                    tracing::debug!(%ticker, "Weighted ticker has no return series.");
                    None
                }
            })
            .collect();

        let Some((_, first)) = contributing.first() else {
            return Ok(Vec::new());
        };

        let weighted: ReturnSeries = first
            .keys()
            .filter(|date| contributing.iter().all(|(_, series)| series.contains_key(*date)))
            .map(|date| {
                let value = stats::checked_sum(
                    contributing.iter().map(|(weight, series)| *weight * series[date]),
                    "weighted return",
                )?;
                Ok((*date, value))
            })
            .collect::<Result<_, AnalyticsError>>()?;

        if weighted.is_empty() {
            tracing::warn!("Return series share no common dates; portfolio return series is empty.");
        }
        Ok(weighted)
    }

    /// Growth of $1: the running product of (1 + r).
    pub fn cumulative_growth(
        &self,
        returns: &[DatedValue],
    ) -> Result<Vec<DatedValue>, AnalyticsError> {
        let mut growth = Decimal::ONE;
        returns
            .iter()
            .map(|&(date, r)| {
                growth = Decimal::ONE
                    .checked_add(r)
                    .and_then(|factor| growth.checked_mul(factor))
                    .ok_or_else(|| stats::overflow("cumulative growth"))?;
                Ok((date, growth))
            })
            .collect()
    }

    /// Computes the four risk statistics independently of one another.
    ///
    /// A statistic that cannot be computed is `None`; it never blocks the others.
    pub fn risk_report(
        &self,
        weighted_returns: &[DatedValue],
        benchmark_returns: Option<&[DatedValue]>,
        risk_free_rate: Decimal,
        trading_days_per_year: u32,
    ) -> RiskReport {
        let volatility = self.volatility(weighted_returns, trading_days_per_year);
        let sharpe = volatility.clone().and_then(|vol| {
            self.sharpe_ratio(weighted_returns, vol, risk_free_rate, trading_days_per_year)
        });
        let beta = match benchmark_returns {
            Some(benchmark) => self.beta(weighted_returns, benchmark),
            None => Err(AnalyticsError::InsufficientData(
                "no benchmark series".to_string(),
            )),
        };
        let max_drawdown = self.max_drawdown(weighted_returns);

        RiskReport {
            volatility: defined("volatility", volatility),
            sharpe: defined("sharpe", sharpe),
            beta: defined("beta", beta),
            max_drawdown: defined("max_drawdown", max_drawdown),
        }
    }

    /// Annualized volatility: sample standard deviation × √trading_days.
    pub fn volatility(
        &self,
        returns: &[DatedValue],
        trading_days_per_year: u32,
    ) -> Result<Decimal, AnalyticsError> {
        let values: Vec<Decimal> = returns.iter().map(|&(_, r)| r).collect();
        let std_dev = stats::sample_std_dev(&values)?;
        std_dev
            .checked_mul(stats::sqrt(Decimal::from(trading_days_per_year))?)
            .ok_or_else(|| stats::overflow("volatility"))
    }

    /// Sharpe ratio: (annualized mean return − risk-free rate) / volatility.
    pub fn sharpe_ratio(
        &self,
        returns: &[DatedValue],
        volatility: Decimal,
        risk_free_rate: Decimal,
        trading_days_per_year: u32,
    ) -> Result<Decimal, AnalyticsError> {
        if volatility.is_zero() {
            return Err(AnalyticsError::DivisionByZero("sharpe".to_string()));
        }
        let values: Vec<Decimal> = returns.iter().map(|&(_, r)| r).collect();
        stats::mean(&values)?
            .checked_mul(Decimal::from(trading_days_per_year))
            .and_then(|annual_return| annual_return.checked_sub(risk_free_rate))
            .and_then(|excess| excess.checked_div(volatility))
            .ok_or_else(|| stats::overflow("sharpe"))
    }

    /// Beta: cov(portfolio, benchmark) / var(benchmark) over their common dates.
    pub fn beta(
        &self,
        returns: &[DatedValue],
        benchmark_returns: &[DatedValue],
    ) -> Result<Decimal, AnalyticsError> {
        let (portfolio, benchmark) = stats::align(returns, benchmark_returns);
        let variance = stats::sample_variance(&benchmark)?;
        if variance.is_zero() {
            return Err(AnalyticsError::DivisionByZero("beta".to_string()));
        }
        stats::sample_covariance(&portfolio, &benchmark)?
            .checked_div(variance)
            .ok_or_else(|| stats::overflow("beta"))
    }

    /// Maximum drawdown of the growth curve built from `returns`.
    pub fn max_drawdown(&self, returns: &[DatedValue]) -> Result<Decimal, AnalyticsError> {
        self.max_drawdown_from_growth(&self.cumulative_growth(returns)?)
    }

    /// The lowest value of growth / running peak − 1. Zero when the curve never
    /// falls below an earlier peak.
    pub fn max_drawdown_from_growth(
        &self,
        growth: &[DatedValue],
    ) -> Result<Decimal, AnalyticsError> {
        let Some(&(_, first)) = growth.first() else {
            return Err(AnalyticsError::InsufficientData(
                "max drawdown of an empty series".to_string(),
            ));
        };

        let mut peak = first;
        let mut max_drawdown = Decimal::ZERO;
        for &(_, value) in growth {
            if value > peak {
                peak = value;
            }
            if peak <= Decimal::ZERO {
                return Err(AnalyticsError::DivisionByZero("max_drawdown".to_string()));
            }
            let drawdown = value
                .checked_div(peak)
                .map(|ratio| ratio - Decimal::ONE)
                .ok_or_else(|| stats::overflow("max_drawdown"))?;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
            }
        }

        Ok(max_drawdown)
    }

    /// Pairwise Pearson correlations, each pair aligned on its own common dates.
    pub fn correlation_matrix(
        &self,
        per_ticker_returns: &BTreeMap<String, ReturnSeries>,
    ) -> CorrelationMatrix {
        let tickers: Vec<String> = per_ticker_returns.keys().cloned().collect();
        let series: Vec<&ReturnSeries> = per_ticker_returns.values().collect();

        let values = series
            .iter()
            .map(|a| {
                series
                    .iter()
                    .map(|b| correlation(a, b).ok())
                    .collect()
            })
            .collect();

        CorrelationMatrix { tickers, values }
    }
}

fn correlation(a: &[DatedValue], b: &[DatedValue]) -> Result<Decimal, AnalyticsError> {
    let (xs, ys) = stats::align(a, b);
    let var_x = stats::sample_variance(&xs)?;
    let var_y = stats::sample_variance(&ys)?;
    if var_x.is_zero() || var_y.is_zero() {
        return Err(AnalyticsError::DivisionByZero("correlation".to_string()));
    }
    if xs == ys {
        return Ok(Decimal::ONE);
    }
    let cov = stats::sample_covariance(&xs, &ys)?;
    let scale = var_x
        .checked_mul(var_y)
        .ok_or_else(|| stats::overflow("correlation"))?;
    cov.checked_div(stats::sqrt(scale)?)
        .ok_or_else(|| stats::overflow("correlation"))
}

/// Turns a statistic's result into the report's "defined or undefined" form.
fn defined(metric: &str, result: Result<Decimal, AnalyticsError>) -> Option<Decimal> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(metric, error = %e, "Statistic is undefined for this run.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PriceSeries;
    use rust_decimal::MathematicalOps;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn dated(values: &[Decimal]) -> Vec<DatedValue> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (d(i as u32 + 1), *v))
            .collect()
    }

    fn prices(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    fn allocation_sum(valuation: &Valuation) -> Decimal {
        valuation.rows.iter().map(|r| r.allocation_pct).sum()
    }

    #[test]
    fn snapshot_values_holdings_and_allocations_sum_to_100() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![
            Holding::new("AAPL", dec!(10), None).unwrap(),
            Holding::new("MSFT", dec!(5), None).unwrap(),
            Holding::new("NVDA", dec!(3), None).unwrap(),
        ];
        let latest = prices(&[("AAPL", dec!(150)), ("MSFT", dec!(300)), ("NVDA", dec!(70))]);

        let valuation = engine.resolve_snapshot(&holdings, &latest).unwrap();

        assert_eq!(valuation.total_market_value, dec!(3210));
        assert_eq!(valuation.rows[0].market_value, dec!(1500));
        assert_eq!(valuation.rows[1].market_value, dec!(1500));
        assert!((allocation_sum(&valuation) - dec!(100)).abs() < dec!(0.000000001));
        assert!(valuation.skipped_tickers.is_empty());
    }

    #[test]
    fn snapshot_skips_unpriced_tickers_and_reports_them() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![
            Holding::new("AAPL", dec!(10), None).unwrap(),
            Holding::new("DELISTED", dec!(100), None).unwrap(),
            Holding::new("MSFT", dec!(1), None).unwrap(),
        ];
        let latest = prices(&[("AAPL", dec!(100)), ("MSFT", dec!(3000))]);

        let valuation = engine.resolve_snapshot(&holdings, &latest).unwrap();

        let tickers: Vec<&str> = valuation.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(valuation.skipped_tickers, vec!["DELISTED".to_string()]);
        assert_eq!(valuation.rows[0].allocation_pct, dec!(25));
        assert_eq!(valuation.rows[1].allocation_pct, dec!(75));
        assert_eq!(allocation_sum(&valuation), dec!(100));
    }

    #[test]
    fn snapshot_with_nothing_priced_is_empty() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![Holding::new("AAPL", dec!(1), None).unwrap()];

        let valuation = engine.resolve_snapshot(&holdings, &BTreeMap::new()).unwrap();

        assert!(valuation.is_empty());
        assert_eq!(valuation.total_market_value, Decimal::ZERO);
        assert_eq!(valuation.skipped_tickers, vec!["AAPL".to_string()]);
    }

    #[test]
    fn snapshot_with_zero_total_value_does_not_divide() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![Holding::new("BUST", dec!(10), None).unwrap()];

        let valuation = engine.resolve_snapshot(&holdings, &prices(&[("BUST", dec!(0))])).unwrap();

        assert!(valuation.is_empty());
        assert!(valuation.skipped_tickers.is_empty());
    }

    #[test]
    fn snapshot_computes_unrealized_gains() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![
            Holding::new("AAPL", dec!(10), Some(dec!(100))).unwrap(),
            Holding::new("MSFT", dec!(2), Some(dec!(400))).unwrap(),
        ];
        let latest = prices(&[("AAPL", dec!(125)), ("MSFT", dec!(300))]);

        let valuation = engine.resolve_snapshot(&holdings, &latest).unwrap();

        assert_eq!(valuation.rows[0].unrealized_gain_abs, Some(dec!(250)));
        assert_eq!(valuation.rows[0].unrealized_gain_pct, Some(dec!(25)));
        assert_eq!(valuation.rows[1].unrealized_gain_abs, Some(dec!(-200)));
        assert_eq!(valuation.rows[1].unrealized_gain_pct, Some(dec!(-25)));
        assert!(valuation.rows.iter().all(|r| r.data_error.is_none()));
    }

    #[test]
    fn snapshot_flags_zero_purchase_price_instead_of_infinite_gain() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![Holding::new("GIFT", dec!(4), Some(dec!(0))).unwrap()];

        let valuation = engine.resolve_snapshot(&holdings, &prices(&[("GIFT", dec!(10))])).unwrap();

        let row = &valuation.rows[0];
        assert_eq!(row.unrealized_gain_abs, Some(dec!(40)));
        assert_eq!(row.unrealized_gain_pct, None);
        assert_eq!(row.data_error, Some(RowDataError::ZeroPurchasePrice));
    }

    #[test]
    fn weights_combine_duplicate_tickers() {
        let engine = AnalyticsEngine::new();
        let holdings = vec![
            Holding::new("AAPL", dec!(1), None).unwrap(),
            Holding::new("MSFT", dec!(2), None).unwrap(),
            Holding::new("aapl", dec!(1), None).unwrap(),
        ];
        let latest = prices(&[("AAPL", dec!(100)), ("MSFT", dec!(100))]);

        let weights = engine.resolve_snapshot(&holdings, &latest).unwrap().weights();

        assert_eq!(weights.len(), 2);
        assert_eq!(weights["AAPL"], dec!(0.5));
        assert_eq!(weights["MSFT"], dec!(0.5));
    }

    #[test]
    fn daily_returns_of_simple_series() {
        let engine = AnalyticsEngine::new();
        let series = PriceSeries::new("X", dated(&[dec!(100), dec!(110), dec!(99)])).unwrap();

        let returns = engine.daily_returns(series.points());

        assert_eq!(returns, vec![(d(2), dec!(0.10)), (d(3), dec!(-0.10))]);
    }

    #[test]
    fn daily_returns_of_short_series_is_empty() {
        let engine = AnalyticsEngine::new();
        assert!(engine.daily_returns(&dated(&[dec!(100)])).is_empty());
        assert!(engine.daily_returns(&[]).is_empty());
    }

    #[test]
    fn cumulative_growth_compounds_returns() {
        let engine = AnalyticsEngine::new();
        let growth = engine
            .cumulative_growth(&dated(&[dec!(0.10), dec!(-0.10)]))
            .unwrap();
        assert_eq!(growth, vec![(d(1), dec!(1.10)), (d(2), dec!(0.99))]);
    }

    #[test]
    fn runaway_growth_is_an_error() {
        let engine = AnalyticsEngine::new();
        let huge = Decimal::from_scientific("1e27").unwrap();

        let result = engine.cumulative_growth(&dated(&[huge, huge]));

        assert!(matches!(result, Err(AnalyticsError::Calculation(_))));
        assert!(engine.max_drawdown(&dated(&[huge, huge])).is_err());
    }

    #[test]
    fn snapshot_of_oversized_position_is_an_error() {
        let engine = AnalyticsEngine::new();
        let shares = Decimal::from_scientific("1e27").unwrap();
        let holdings = vec![Holding::new("AAPL", shares, Some(dec!(1))).unwrap()];

        let result = engine.resolve_snapshot(&holdings, &prices(&[("AAPL", dec!(500))]));

        assert!(matches!(result, Err(AnalyticsError::Calculation(_))));
    }

    #[test]
    fn out_of_range_return_is_skipped() {
        let engine = AnalyticsEngine::new();
        let series = dated(&[dec!(0.0000000000000000000000000001), Decimal::MAX, Decimal::MAX]);

        let returns = engine.daily_returns(&series);

        assert_eq!(returns, vec![(d(3), Decimal::ZERO)]);
    }

    #[test]
    fn weighted_returns_inner_join_dates() {
        let engine = AnalyticsEngine::new();
        let mut per_ticker = BTreeMap::new();
        per_ticker.insert(
            "A".to_string(),
            vec![(d(2), dec!(0.10)), (d(3), dec!(0.02)), (d(4), dec!(0.04))],
        );
        per_ticker.insert("B".to_string(), vec![(d(2), dec!(-0.10)), (d(4), dec!(0.00))]);
        per_ticker.insert("UNWEIGHTED".to_string(), vec![(d(2), dec!(5))]);
        let weights = prices(&[("A", dec!(0.75)), ("B", dec!(0.25))]);

        let weighted = engine
            .weighted_portfolio_returns(&per_ticker, &weights)
            .unwrap();

        assert_eq!(weighted, vec![(d(2), dec!(0.05)), (d(4), dec!(0.03))]);
    }

    #[test]
    fn weighted_returns_of_disjoint_calendars_is_empty() {
        let engine = AnalyticsEngine::new();
        let mut per_ticker = BTreeMap::new();
        per_ticker.insert("A".to_string(), vec![(d(2), dec!(0.01))]);
        per_ticker.insert("B".to_string(), vec![(d(3), dec!(0.01))]);
        let weights = prices(&[("A", dec!(0.5)), ("B", dec!(0.5))]);

        let weighted = engine
            .weighted_portfolio_returns(&per_ticker, &weights)
            .unwrap();
        assert!(weighted.is_empty());

        let report = engine.risk_report(&weighted, None, dec!(0.03), 252);
        assert_eq!(report, RiskReport::default());
    }

    #[test]
    fn weighted_returns_reject_overweight_portfolios() {
        let engine = AnalyticsEngine::new();
        let weights = prices(&[("A", dec!(0.7)), ("B", dec!(0.7))]);
        let result = engine.weighted_portfolio_returns(&BTreeMap::new(), &weights);
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }

    #[test]
    fn flat_returns_have_zero_volatility_and_undefined_sharpe() {
        let engine = AnalyticsEngine::new();
        let returns = dated(&[dec!(0), dec!(0), dec!(0), dec!(0)]);

        let report = engine.risk_report(&returns, None, dec!(0.03), 252);

        assert_eq!(report.volatility, Some(Decimal::ZERO));
        assert_eq!(report.sharpe, None);
        assert_eq!(report.max_drawdown, Some(Decimal::ZERO));
        assert_eq!(report.beta, None);
    }

    #[test]
    fn volatility_and_sharpe_follow_annualization() {
        let engine = AnalyticsEngine::new();
        // mean 0.01, sample variance 0.0002
        let returns = dated(&[dec!(0.02), dec!(0.00)]);

        let vol = engine.volatility(&returns, 1).unwrap();
        let expected_vol = dec!(0.0002).sqrt().unwrap() * dec!(1).sqrt().unwrap();
        assert_eq!(vol, expected_vol);

        let sharpe = engine
            .sharpe_ratio(&returns, vol, dec!(0.005), 1)
            .unwrap();
        assert_eq!(sharpe, dec!(0.005) / expected_vol);
    }

    #[test]
    fn single_return_is_insufficient_for_volatility() {
        let engine = AnalyticsEngine::new();
        let result = engine.volatility(&dated(&[dec!(0.01)]), 252);
        assert!(matches!(result, Err(AnalyticsError::InsufficientData(_))));
    }

    #[test]
    fn beta_of_scaled_benchmark() {
        let engine = AnalyticsEngine::new();
        let benchmark = dated(&[dec!(0.01), dec!(-0.02), dec!(0.04)]);
        let portfolio: Vec<DatedValue> = benchmark.iter().map(|&(dt, r)| (dt, r * dec!(2))).collect();

        assert_eq!(engine.beta(&portfolio, &benchmark).unwrap(), dec!(2));
    }

    #[test]
    fn beta_aligns_dates_before_computing() {
        let engine = AnalyticsEngine::new();
        let portfolio = vec![(d(2), dec!(0.02)), (d(3), dec!(-0.04)), (d(9), dec!(0.5))];
        let benchmark = vec![(d(1), dec!(0.7)), (d(2), dec!(0.01)), (d(3), dec!(-0.02))];

        assert_eq!(engine.beta(&portfolio, &benchmark).unwrap(), dec!(2));
    }

    #[test]
    fn beta_with_flat_benchmark_is_undefined() {
        let engine = AnalyticsEngine::new();
        let portfolio = dated(&[dec!(0.01), dec!(0.02), dec!(0.03)]);
        let benchmark = dated(&[dec!(0.01), dec!(0.01), dec!(0.01)]);

        let report = engine.risk_report(&portfolio, Some(&benchmark), dec!(0), 252);

        assert_eq!(report.beta, None);
        assert!(report.volatility.is_some());
        assert!(report.sharpe.is_some());
        assert!(report.max_drawdown.is_some());
    }

    #[test]
    fn max_drawdown_from_peak() {
        let engine = AnalyticsEngine::new();
        let growth = dated(&[dec!(1.0), dec!(1.2), dec!(0.9), dec!(1.1)]);

        assert_eq!(engine.max_drawdown_from_growth(&growth).unwrap(), dec!(-0.25));
    }

    #[test]
    fn max_drawdown_of_rising_curve_is_zero() {
        let engine = AnalyticsEngine::new();
        let returns = dated(&[dec!(0.01), dec!(0.02), dec!(0.0)]);
        assert_eq!(engine.max_drawdown(&returns).unwrap(), Decimal::ZERO);
        assert!(engine.max_drawdown(&[]).is_err());
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let engine = AnalyticsEngine::new();
        let mut per_ticker = BTreeMap::new();
        per_ticker.insert("A".to_string(), dated(&[dec!(0.01), dec!(0.02), dec!(0.03)]));
        per_ticker.insert("B".to_string(), dated(&[dec!(0.03), dec!(0.02), dec!(0.01)]));
        per_ticker.insert("FLAT".to_string(), dated(&[dec!(0), dec!(0), dec!(0)]));

        let matrix = engine.correlation_matrix(&per_ticker);

        assert_eq!(matrix.tickers, vec!["A", "B", "FLAT"]);
        assert_eq!(matrix.get("A", "A"), Some(Decimal::ONE));
        let a_b = matrix.get("A", "B").unwrap();
        assert!((a_b - Decimal::NEGATIVE_ONE).abs() < dec!(0.000000000001));
        assert_eq!(matrix.get("B", "A"), matrix.get("A", "B"));
        assert_eq!(matrix.get("A", "FLAT"), None);
    }

    #[test]
    fn analyze_rejects_zero_trading_days() {
        let engine = AnalyticsEngine::new();
        let settings = AnalysisSettings {
            trading_days_per_year: 0,
            ..AnalysisSettings::default()
        };
        let result = engine.analyze(&AnalysisInput::default(), &settings);
        assert!(matches!(result, Err(AnalyticsError::InvalidInput(_))));
    }
}
