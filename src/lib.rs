// Reappointment Trends - Core Library
// Exposes all modules for use in the CLI and tests

pub mod appointment;
pub mod config;
pub mod error;
pub mod warnings;

pub mod normalize;  // Identity keys
pub mod inference;  // Reappointment inference over identity groups
pub mod aggregate;  // Org-year counts and rates
pub mod leaders;    // Yearly leader selection
pub mod annual;     // Government-wide annual proportions
pub mod stats;      // Distribution functions + Shapiro-Wilk
pub mod trend;      // OLS trend + diagnostics
pub mod pipeline;

pub mod ingest;
pub mod db;

// Re-export commonly used types
pub use appointment::{parse_year, AppointmentRecord, ReappointedFlag};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use warnings::{RunWarning, Severity};
pub use normalize::{IdentityKey, IdentityNormalizer};
pub use inference::{InferenceOutcome, InferredAppointment, ReappointmentInferer};
pub use aggregate::{
    AggregationOutcome, Aggregator, OrgYearCount, OrgYearTally, RateRecord, UNKNOWN_ORGANIZATION,
};
pub use leaders::{Contender, LeaderSelection, YearlyLeader, YearlyLeaderSelector};
pub use annual::{AnnualProportion, AnnualProportionCalculator, AnnualSeries};
pub use trend::{RegressionResult, TrendAnalysis, TrendAnalyzer, TrendDirection};
pub use pipeline::{AnalysisReport, ReappointmentPipeline};
pub use ingest::{load_appointment_files, load_appointments_csv};
pub use db::{
    count_runs, count_warnings, load_annual_proportions, load_regression, save_report,
    setup_database,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
