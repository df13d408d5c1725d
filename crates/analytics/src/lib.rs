//! # Portfolio Analytics Engine
//!
//! This crate turns a list of holdings and their daily closing prices into a
//! valuation, a weighted portfolio return series and a set of risk statistics.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of files,
//!   networks or terminals. It depends only on `core-types` and the
//!   `AnalysisSettings` value from `configuration`.
//! - **Stateless Calculation:** The `AnalyticsEngine` keeps no state between runs.
//!   Identical inputs always produce identical outputs, down to the last digit,
//!   because all arithmetic is Decimal and all ticker maps are ordered.
//! - **Explicit Gaps:** Unpriced holdings, zero purchase prices and undefined
//!   statistics are reported in the output instead of aborting the run.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The struct that contains the calculation logic.
//! - `AnalysisInput` / `PortfolioAnalysis`: The input and output of a full run.
//! - `Valuation`, `PortfolioSnapshot`, `RiskReport`, `CorrelationMatrix`: The result parts.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod report;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use report::{
    AnalysisInput, CorrelationMatrix, PortfolioAnalysis, PortfolioSnapshot, RiskReport,
    RowDataError, Valuation,
};
