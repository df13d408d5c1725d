use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    InsufficientData(String),

    #[error("Calculation error: Division by zero encountered in metric '{0}'")]
    DivisionByZero(String),

    #[error("Invalid analytics input: {0}")]
    InvalidInput(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
