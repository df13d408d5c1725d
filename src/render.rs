use analytics::{PortfolioAnalysis, RowDataError};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use configuration::AnalysisSettings;
use market_data::HoldingsLoad;
use rust_decimal::Decimal;

/// Prints the warnings and notes that accompany a run with gaps in its data.
pub fn print_notices(load: &HoldingsLoad, analysis: &PortfolioAnalysis) {
    for row in &load.dropped {
        println!("⚠ Holdings line {} was dropped: {}", row.line, row.reason);
    }
    for ticker in &analysis.valuation.skipped_tickers {
        println!("⚠ Data for {ticker} not found. Skipping.");
    }
    if !load.has_purchase_price {
        println!("ℹ Purchase Price column not found. Unrealized gains/losses omitted.");
    }
    for row in &analysis.valuation.rows {
        if row.data_error == Some(RowDataError::ZeroPurchasePrice) {
            println!("⚠ {} has a purchase price of 0; its gain % is undefined.", row.ticker);
        }
    }
    if analysis.valuation.rows.is_empty() {
        println!("⚠ No holdings could be valued. Check tickers and price data.");
    }
}

pub fn print_analysis(analysis: &PortfolioAnalysis, settings: &AnalysisSettings) {
    if analysis.valuation.rows.is_empty() {
        return;
    }
    print_overview(analysis);
    print_performance(analysis, settings);
    print_risk(analysis, settings);
    print_correlation(analysis);
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn print_overview(analysis: &PortfolioAnalysis) {
    let with_gains = analysis
        .valuation
        .rows
        .iter()
        .any(|r| r.purchase_price.is_some());

    let mut header = vec!["Ticker", "Shares", "Current Price", "Market Value", "Allocation %"];
    if with_gains {
        header.extend(["Unrealized Gain ($)", "Unrealized Gain (%)"]);
    }
    let mut table = new_table(header);

    for row in &analysis.valuation.rows {
        let mut cells = vec![
            Cell::new(&row.ticker),
            right(row.shares.normalize().to_string()),
            right(format!("${:.2}", row.current_price)),
            right(money(row.market_value)),
            right(percent(row.allocation_pct)),
        ];
        if with_gains {
            cells.push(right(row.unrealized_gain_abs.map(money).unwrap_or_else(na)));
            cells.push(right(row.unrealized_gain_pct.map(percent).unwrap_or_else(na)));
        }
        table.add_row(cells);
    }

    println!("\nPortfolio Overview");
    println!("{table}");
    println!("Total market value: {}", money(analysis.valuation.total_market_value));
}

fn print_performance(analysis: &PortfolioAnalysis, settings: &AnalysisSettings) {
    let mut table = new_table(vec!["Series", "From", "To", "Growth of $1"]);

    let mut add = |label: String, curve: &[(chrono::NaiveDate, Decimal)]| {
        match (curve.first(), curve.last()) {
            (Some((from, _)), Some((to, growth))) => table.add_row(vec![
                Cell::new(label),
                Cell::new(from),
                Cell::new(to),
                right(format!("{growth:.4}")),
            ]),
            _ => table.add_row(vec![
                Cell::new(label),
                Cell::new("-"),
                Cell::new("-"),
                right(na()),
            ]),
        };
    };
    add("Your Portfolio".to_string(), &analysis.portfolio_growth);
    add(settings.benchmark_ticker.clone(), &analysis.benchmark_growth);

    println!("\nPortfolio Performance vs. {}", settings.benchmark_ticker);
    println!("{table}");
}

fn print_risk(analysis: &PortfolioAnalysis, settings: &AnalysisSettings) {
    let risk = &analysis.risk;
    let mut table = new_table(vec!["Metric", "Value"]);

    table.add_row(vec![
        Cell::new("Portfolio Volatility (Annualized)"),
        right(risk.volatility.map(fraction_as_percent).unwrap_or_else(na)),
    ]);
    table.add_row(vec![
        Cell::new(format!(
            "Sharpe Ratio (Risk-Free Rate {})",
            fraction_as_percent(settings.risk_free_rate)
        )),
        right(risk.sharpe.map(|s| format!("{s:.2}")).unwrap_or_else(na)),
    ]);
    table.add_row(vec![
        Cell::new(format!("Beta (vs. {})", settings.benchmark_ticker)),
        right(risk.beta.map(|b| format!("{b:.2}")).unwrap_or_else(na)),
    ]);
    table.add_row(vec![
        Cell::new("Maximum Drawdown"),
        right(risk.max_drawdown.map(fraction_as_percent).unwrap_or_else(na)),
    ]);

    println!("\nPortfolio Risk Metrics");
    println!("{table}");
}

fn print_correlation(analysis: &PortfolioAnalysis) {
    let matrix = &analysis.correlation;
    if matrix.tickers.len() < 2 {
        return;
    }

    let mut header = vec![""];
    header.extend(matrix.tickers.iter().map(String::as_str));
    let mut table = new_table(header);

    for (ticker, row) in matrix.tickers.iter().zip(&matrix.values) {
        let mut cells = vec![Cell::new(ticker)];
        cells.extend(
            row.iter()
                .map(|value| right(value.map(|v| format!("{v:.2}")).unwrap_or_else(na))),
        );
        table.add_row(cells);
    }

    println!("\nCorrelation Between Assets");
    println!("{table}");
}

fn na() -> String {
    "n/a".to_string()
}

fn percent(value: Decimal) -> String {
    format!("{value:.2}%")
}

fn fraction_as_percent(value: Decimal) -> String {
    percent(value * Decimal::ONE_HUNDRED)
}

/// Formats a dollar amount with two decimals and thousands separators.
fn money(value: Decimal) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
