use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Parameters for a single analysis run.
///
/// This value is owned by the caller and passed explicitly into the analytics
/// engine; nothing in the engine reads configuration on its own.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Annual risk-free rate used by the Sharpe ratio (0.03 == 3%).
    pub risk_free_rate: Decimal,
    /// Number of trading sessions used to annualize daily statistics.
    pub trading_days_per_year: u32,
    /// The index or fund the portfolio is compared against (e.g. "^GSPC").
    pub benchmark_ticker: String,
    /// First date of the price history window.
    pub start_date: NaiveDate,
    /// Last date of the price history window. `None` means today.
    pub end_date: Option<NaiveDate>,
}

/// Where the file-backed collaborators read their data from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Long-format CSV of daily closes (`Date,Ticker,Close`).
    pub prices_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

/// How the analysis is presented on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable terminal tables.
    #[default]
    Table,
    /// A single pretty-printed JSON document.
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

// --- Default Implementations ---
// This allows a user to omit any section from their toml
// and still have it work with sensible defaults.

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: dec!(0.03),
            trading_days_per_year: 252,
            benchmark_ticker: "^GSPC".to_string(),
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end_date: None,
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            prices_path: PathBuf::from("prices.csv"),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
