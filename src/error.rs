use crate::schema::Metric;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComparisonError {
    #[error("Invalid period type: '{0}'. Expected 'current month', 'last 7 days', 'last 15 days' or 'last 30 days'")]
    InvalidPeriodType(String),

    #[error("Metric column '{}' is missing from the input table", .0.column_name())]
    MissingMetricColumn(Metric),

    #[error("Account '{0}' has no rows in the current period")]
    NoCurrentData(String),

    #[error("Duplicate metric record for account '{account}' on {date}")]
    DuplicateRecord { account: String, date: NaiveDate },

    #[error("Invalid monthly goal {0}: must be a finite value greater than zero")]
    InvalidGoal(f64),

    #[error("Validation error for account '{account}': {details}")]
    ValidationError { account: String, details: String },

    #[error("Parse error on line {line}: {details}")]
    ParseError { line: u64, details: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ComparisonError>;
