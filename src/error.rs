use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// A numeric cell could not be parsed
    #[error("Malformed number at line {row}: feature {feature} (column \"{column}\") has value {value:?}")]
    MalformedNumber {
        row: u64,
        feature: String,
        column: String,
        value: String,
    },

    /// A categorical cell holds a value outside the feature's declared value set
    #[error("Unknown category at line {row}: feature {feature} has undeclared value {value:?}")]
    UnknownCategory {
        row: u64,
        feature: String,
        value: String,
    },

    /// A requested feature is not part of the dataset schema
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Not enough records (or not enough of each class) to evaluate
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The CSV header lacks a column the schema reads from
    #[error("Missing column in CSV header: \"{column}\"")]
    MissingColumn { column: String },

    /// CSV framing errors (ragged rows, bad quoting, invalid UTF-8)
    #[error("CSV error: {0}")]
    Csv(String),

    /// Cost matrix literal could not be parsed or is unusable
    #[error("Invalid cost matrix: {0}")]
    InvalidCostMatrix(String),

    /// Errors raised by the underlying learning library
    #[error("Learner error: {0}")]
    Learner(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::MalformedNumber { .. } => "MALFORMED_NUMBER",
            AppError::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            AppError::UnknownFeature(_) => "UNKNOWN_FEATURE",
            AppError::InsufficientData(_) => "INSUFFICIENT_DATA",
            AppError::MissingColumn { .. } => "MISSING_COLUMN",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::InvalidCostMatrix(_) => "INVALID_COST_MATRIX",
            AppError::Learner(_) => "LEARNER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Conversion from csv::Error
///
/// IO failures underneath the CSV reader stay IO errors.
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => AppError::Io(io),
                other => AppError::Csv(format!("{:?}", other)),
            }
        } else {
            AppError::Csv(err.to_string())
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
