use analytics::{AnalysisInput, AnalyticsEngine, PortfolioAnalysis};
use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use configuration::{AnalysisSettings, Config, OutputFormat, load_config};
use core_types::{Holding, PriceSeries, normalize_ticker};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use market_data::{CsvPriceSource, HoldingsLoad, PriceSource, load_holdings, write_snapshot_csv};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

mod render;

/// The main entry point for the portfolio analyzer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (RUST_LOG, PORTFOLIO__*) from a .env file if present
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = configuration::logging::init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Analyze(args) => handle_analyze(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Values a portfolio of stock holdings and measures its risk against a benchmark.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a holdings CSV (columns: Ticker, Shares, optional Purchase Price).
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// The holdings CSV file.
    #[arg(long)]
    holdings: PathBuf,

    /// Daily closes CSV (columns: Date, Ticker, Close). Overrides `data.prices_path`.
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Benchmark ticker (e.g., "^GSPC"). Overrides `analysis.benchmark_ticker`.
    #[arg(long)]
    benchmark: Option<String>,

    /// Start of the history window (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End of the history window (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Annual risk-free rate as a fraction (e.g., 0.03).
    #[arg(long)]
    risk_free_rate: Option<Decimal>,

    /// How to print the analysis.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Also write the snapshot table to this CSV file.
    #[arg(long)]
    export: Option<PathBuf>,
}

// ==============================================================================
// Analyze Command Logic
// ==============================================================================

/// Handles the orchestration of one analysis run.
async fn handle_analyze(args: AnalyzeArgs, config: Config) -> anyhow::Result<()> {
    let settings = apply_overrides(&args, config.analysis.clone());
    let end = settings
        .end_date
        .unwrap_or_else(|| Local::now().date_naive());
    anyhow::ensure!(
        settings.start_date < end,
        "start date {} must be before end date {}",
        settings.start_date,
        end
    );

    let run_id = Uuid::new_v4();
    run_analysis(args, config, settings, end)
        .instrument(tracing::info_span!("analysis", %run_id))
        .await
}

async fn run_analysis(
    args: AnalyzeArgs,
    config: Config,
    settings: AnalysisSettings,
    end: NaiveDate,
) -> anyhow::Result<()> {
    tracing::info!(
        holdings = %args.holdings.display(),
        benchmark = %settings.benchmark_ticker,
        from = %settings.start_date,
        to = %end,
        "Starting portfolio analysis."
    );

    let raw = tokio::fs::read(&args.holdings)
        .await
        .with_context(|| format!("Failed to read holdings file {}", args.holdings.display()))?;
    let load = load_holdings(raw.as_slice()).context("Holdings file is not usable")?;

    let prices_path = args.prices.clone().unwrap_or(config.data.prices_path);
    let source = CsvPriceSource::from_path(&prices_path)
        .await
        .with_context(|| format!("Failed to load prices from {}", prices_path.display()))?;

    let input = fetch_market_data(&source, load.holdings.clone(), &settings, end).await?;

    let engine = AnalyticsEngine::new();
    let analysis = engine.analyze(&input, &settings)?;

    let format = args.format.unwrap_or(config.output.format);
    report(&load, &analysis, &settings, format)?;

    if let Some(path) = &args.export {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_snapshot_csv(file, &analysis.valuation)?;
        tracing::info!(path = %path.display(), "Snapshot exported.");
    }

    Ok(())
}

/// Command-line values win over the configuration file.
fn apply_overrides(args: &AnalyzeArgs, mut settings: AnalysisSettings) -> AnalysisSettings {
    if let Some(benchmark) = &args.benchmark {
        settings.benchmark_ticker = benchmark.clone();
    }
    if let Some(from) = args.from {
        settings.start_date = from;
    }
    if let Some(to) = args.to {
        settings.end_date = Some(to);
    }
    if let Some(rate) = args.risk_free_rate {
        settings.risk_free_rate = rate;
    }
    settings
}

/// Concurrently fetches latest closes and histories for every holding and the benchmark.
async fn fetch_market_data<S: PriceSource>(
    source: &S,
    holdings: Vec<Holding>,
    settings: &AnalysisSettings,
    end: NaiveDate,
) -> anyhow::Result<AnalysisInput> {
    let mut tickers: Vec<String> = holdings.iter().map(|h| h.ticker.clone()).collect();
    tickers.sort();
    tickers.dedup();
    let benchmark = normalize_ticker(&settings.benchmark_ticker);

    // Set up the progress bar
    let progress_bar = ProgressBar::new(tickers.len() as u64 + 1);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    // The benchmark is fetched as its own job even if it is also held.
    let jobs = tickers
        .iter()
        .map(|ticker| (ticker, false))
        .chain(std::iter::once((&benchmark, true)));

    let fetches = jobs.map(|(ticker, is_benchmark)| {
        let pb = progress_bar.clone();
        async move {
            pb.set_message(format!("Fetching {ticker}..."));
            let latest = source.latest_close(ticker, end).await?;
            let history = source.daily_closes(ticker, settings.start_date, end).await?;
            pb.inc(1);
            Ok::<_, market_data::DataError>((ticker.clone(), is_benchmark, latest, history))
        }
    });

    let results = join_all(fetches).await;
    progress_bar.finish_and_clear();

    let mut latest_prices = BTreeMap::new();
    let mut histories: BTreeMap<String, PriceSeries> = BTreeMap::new();
    let mut benchmark_series = None;

    for result in results {
        let (ticker, is_benchmark, latest, history) = result?;
        if is_benchmark {
            if history.is_none() {
                tracing::warn!(%ticker, "No benchmark history; beta and comparison are unavailable.");
            }
            benchmark_series = history;
            continue;
        }
        match latest {
            Some(price) => {
                latest_prices.insert(ticker.clone(), price);
            }
            None => tracing::warn!(%ticker, "Data for ticker not found."),
        }
        if let Some(series) = history {
            histories.insert(ticker, series);
        }
    }

    Ok(AnalysisInput {
        holdings,
        latest_prices,
        histories,
        benchmark: benchmark_series,
    })
}

fn report(
    load: &HoldingsLoad,
    analysis: &PortfolioAnalysis,
    settings: &AnalysisSettings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(analysis)?);
        }
        OutputFormat::Table => {
            render::print_notices(load, analysis);
            render::print_analysis(analysis, settings);
        }
    }
    Ok(())
}
