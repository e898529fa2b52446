//! Error types for the reappointment analysis core.

use thiserror::Error;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Fatal errors. Recoverable anomalies are reported as
/// [`RunWarning`](crate::warnings::RunWarning) instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No records at all were supplied.
    #[error("input contains no appointment records")]
    EmptyInput,

    /// A required field is absent from every record.
    #[error("required field '{field}' is missing from every record")]
    MissingField { field: String },

    /// Per-organization totals disagree with the direct per-year count.
    #[error(
        "data integrity failure for {year}: organizations sum to {org_total} appointments, records count {direct_total}"
    )]
    IntegrityMismatch {
        year: i32,
        org_total: u64,
        direct_total: u64,
    },

    /// Not enough points to fit a trend line.
    #[error("regression needs at least {required} data points, got {points}")]
    InsufficientData { points: usize, required: usize },

    /// Configured year range is empty.
    #[error("invalid year range: start {start} is after end {end}")]
    InvalidYearRange { start: i32, end: i32 },

    /// Any other configuration problem.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
