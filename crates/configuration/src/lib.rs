use crate::error::ConfigError;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use rust_decimal::Decimal;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnalysisSettings, Config, DataSettings, LoggingSettings, OutputFormat, OutputSettings,
};

/// Prefix of the environment variables that override file values,
/// e.g. `PORTFOLIO__ANALYSIS__RISK_FREE_RATE=0.045`.
pub const ENV_PREFIX: &str = "PORTFOLIO";

/// Loads the application configuration.
///
/// This function is the primary entry point for this crate. It reads the
/// optional configuration file at `path`, layers `PORTFOLIO__*` environment
/// variables on top, deserializes the result into our strongly-typed `Config`
/// struct and validates it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // A missing file is fine: every section has defaults.
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    build(builder)
}

/// Parses configuration from an in-memory TOML document, without environment overrides.
pub fn config_from_toml_str(toml: &str) -> Result<Config, ConfigError> {
    build(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    let config = builder.build()?.try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

/// Checks the cross-field rules that serde cannot express.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let analysis = &config.analysis;

    if analysis.trading_days_per_year == 0 {
        return Err(ConfigError::ValidationError(
            "analysis.trading_days_per_year must be greater than 0".to_string(),
        ));
    }
    if analysis.benchmark_ticker.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "analysis.benchmark_ticker must not be empty".to_string(),
        ));
    }
    if analysis.risk_free_rate <= Decimal::NEGATIVE_ONE || analysis.risk_free_rate >= Decimal::ONE
    {
        return Err(ConfigError::ValidationError(format!(
            "analysis.risk_free_rate must be a fraction between -1 and 1, got {}",
            analysis.risk_free_rate
        )));
    }
    if let Some(end) = analysis.end_date {
        if end <= analysis.start_date {
            return Err(ConfigError::ValidationError(format!(
                "analysis.end_date ({end}) must be after analysis.start_date ({})",
                analysis.start_date
            )));
        }
    }

    Ok(())
}
