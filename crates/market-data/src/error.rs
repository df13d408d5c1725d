use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("The {source_name} file must include a '{column}' column.")]
    MissingRequiredColumn {
        source_name: &'static str,
        column: &'static str,
    },

    #[error("Failed to read or write CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data on line {line}: {message}")]
    InvalidData { line: u64, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
