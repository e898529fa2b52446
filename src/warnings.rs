// ⚠️ Run Warnings - every recoverable anomaly surfaces here, with counts
// Nothing is corrected silently: stages return their warnings next to their output

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning, // Data was excluded, clamped or omitted
    Info,    // Advisory statistical diagnostic
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunWarning {
    /// Records with a missing or unparseable year
    RecordsWithoutYear { count: usize },

    /// Records whose name, position and organization are all empty
    UnmatchableIdentity { count: usize },

    /// Records filed under the unknown-organization label
    UnknownOrganization { count: usize, label: String },

    /// Records with a year outside the configured range
    RecordsOutsideYearRange { count: usize, start: i32, end: i32 },

    /// Reappointments exceeded appointments; rate clamped to 1.0
    RateClamped {
        organization: String,
        year: i32,
        total_appointments: u64,
        reappointment_count: u64,
    },

    /// No organization met the leader threshold in this year
    LeaderYearOmitted { year: i32, min_appointments: u64 },

    /// Years whose standardized residual exceeded the outlier threshold
    OutlierYears { years: Vec<i32>, threshold: f64 },

    /// Shapiro-Wilk rejected normality of the residuals
    NonNormalResiduals { p_value: f64, alpha: f64 },

    /// Shapiro-Wilk could not be evaluated on these residuals
    NormalityTestUnavailable { reason: String },

    /// Durbin-Watson statistic outside the acceptable band
    ResidualAutocorrelation { durbin_watson: f64, low: f64, high: f64 },

    /// The trend could not be fitted at all
    TrendUnavailable { reason: String },
}

impl RunWarning {
    pub fn severity(&self) -> Severity {
        match self {
            RunWarning::OutlierYears { .. }
            | RunWarning::NonNormalResiduals { .. }
            | RunWarning::NormalityTestUnavailable { .. }
            | RunWarning::ResidualAutocorrelation { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Short stable identifier, used as the stored warning kind
    pub fn kind(&self) -> &'static str {
        match self {
            RunWarning::RecordsWithoutYear { .. } => "records_without_year",
            RunWarning::UnmatchableIdentity { .. } => "unmatchable_identity",
            RunWarning::UnknownOrganization { .. } => "unknown_organization",
            RunWarning::RecordsOutsideYearRange { .. } => "records_outside_year_range",
            RunWarning::RateClamped { .. } => "rate_clamped",
            RunWarning::LeaderYearOmitted { .. } => "leader_year_omitted",
            RunWarning::OutlierYears { .. } => "outlier_years",
            RunWarning::NonNormalResiduals { .. } => "non_normal_residuals",
            RunWarning::NormalityTestUnavailable { .. } => "normality_test_unavailable",
            RunWarning::ResidualAutocorrelation { .. } => "residual_autocorrelation",
            RunWarning::TrendUnavailable { .. } => "trend_unavailable",
        }
    }
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::RecordsWithoutYear { count } => write!(
                f,
                "{} record(s) have no usable year; kept with their original flag but not grouped or counted per year",
                count
            ),
            RunWarning::UnmatchableIdentity { count } => write!(
                f,
                "{} record(s) have empty name, position and organization; treated as standalone appointments",
                count
            ),
            RunWarning::UnknownOrganization { count, label } => {
                write!(f, "{} record(s) had no organization and were counted as '{}'", count, label)
            }
            RunWarning::RecordsOutsideYearRange { count, start, end } => write!(
                f,
                "{} record(s) fall outside {}-{} and are excluded from the annual series",
                count, start, end
            ),
            RunWarning::RateClamped {
                organization,
                year,
                total_appointments,
                reappointment_count,
            } => write!(
                f,
                "{} in {}: {} reappointments exceed {} appointments; rate clamped to 1.0",
                organization, year, reappointment_count, total_appointments
            ),
            RunWarning::LeaderYearOmitted { year, min_appointments } => write!(
                f,
                "{}: no organization has at least {} appointments; year omitted from leaders",
                year, min_appointments
            ),
            RunWarning::OutlierYears { years, threshold } => write!(
                f,
                "{} outlier year(s) with |standardized residual| > {}: {:?}",
                years.len(),
                threshold,
                years
            ),
            RunWarning::NonNormalResiduals { p_value, alpha } => write!(
                f,
                "residuals look non-normal (Shapiro-Wilk p = {:.4} < {})",
                p_value, alpha
            ),
            RunWarning::NormalityTestUnavailable { reason } => {
                write!(f, "normality test not evaluated: {}", reason)
            }
            RunWarning::ResidualAutocorrelation {
                durbin_watson,
                low,
                high,
            } => write!(
                f,
                "residual autocorrelation suspected (Durbin-Watson = {:.3}, expected {}-{})",
                durbin_watson, low, high
            ),
            RunWarning::TrendUnavailable { reason } => write!(f, "trend not fitted: {}", reason),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_are_info() {
        let w = RunWarning::NonNormalResiduals {
            p_value: 0.01,
            alpha: 0.05,
        };
        assert_eq!(w.severity(), Severity::Info);
        assert_eq!(w.kind(), "non_normal_residuals");

        let w = RunWarning::RecordsWithoutYear { count: 3 };
        assert_eq!(w.severity(), Severity::Warning);
    }

    #[test]
    fn test_messages_carry_counts() {
        let w = RunWarning::RateClamped {
            organization: "Health Agency".to_string(),
            year: 2019,
            total_appointments: 4,
            reappointment_count: 6,
        };
        let msg = w.to_string();
        assert!(msg.contains("Health Agency"));
        assert!(msg.contains("2019"));
        assert!(msg.contains("6 reappointments exceed 4"));
    }
}
