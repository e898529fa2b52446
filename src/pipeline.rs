// 🧭 Reappointment Pipeline - the six stages composed over one immutable batch
//
//   Normalizer → Inferer → Aggregator → { YearlyLeaderSelector,
//                                         AnnualProportionCalculator → TrendAnalyzer }
//
// Every stage gets an immutable snapshot and returns a fresh structure plus its warnings.

use crate::aggregate::{Aggregator, OrgYearCount, RateRecord};
use crate::annual::{AnnualProportion, AnnualProportionCalculator};
use crate::appointment::AppointmentRecord;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::inference::{InferredAppointment, ReappointmentInferer};
use crate::leaders::{YearlyLeader, YearlyLeaderSelector};
use crate::normalize::IdentityNormalizer;
use crate::trend::{RegressionResult, TrendAnalyzer};
use crate::warnings::{RunWarning, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// ANALYSIS REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub config: AnalysisConfig,

    pub appointments: Vec<InferredAppointment>,
    pub org_year_counts: Vec<OrgYearCount>,
    pub rates: Vec<RateRecord>,
    pub yearly_leaders: Vec<YearlyLeader>,
    pub annual_proportions: Vec<AnnualProportion>,

    /// `None` when the trend could not be fitted (see warnings)
    pub regression: Option<RegressionResult>,

    pub warnings: Vec<RunWarning>,
}

impl AnalysisReport {
    pub fn record_count(&self) -> usize {
        self.appointments.len()
    }

    pub fn reappointment_count(&self) -> usize {
        self.appointments
            .iter()
            .filter(|a| a.is_reappointment())
            .count()
    }

    pub fn inferred_count(&self) -> usize {
        self.appointments.iter().filter(|a| a.inferred).count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.severity() == Severity::Warning)
            .count()
    }

    pub fn summary(&self) -> String {
        let trend = match &self.regression {
            Some(r) => r.summary(),
            None => "no trend fitted".to_string(),
        };
        format!(
            "{} appointments ({} reappointments, {} inferred) across {} org-years, {}-{}; {} leader year(s); {}; {} warning(s), {} diagnostic note(s)",
            self.record_count(),
            self.reappointment_count(),
            self.inferred_count(),
            self.org_year_counts.len(),
            self.config.year_start,
            self.config.year_end,
            self.yearly_leaders.len(),
            trend,
            self.warning_count(),
            self.warnings.len() - self.warning_count(),
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct ReappointmentPipeline {
    config: AnalysisConfig,
}

impl ReappointmentPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(ReappointmentPipeline { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, records: &[AppointmentRecord]) -> Result<AnalysisReport> {
        check_structure(records)?;
        info!(records = records.len(), "starting reappointment analysis");

        let mut warnings = Vec::new();

        // 1-2. Normalize + infer
        let normalizer = IdentityNormalizer::with_honorifics(&self.config.honorifics);
        let inference = ReappointmentInferer::new(normalizer).infer(records);
        warnings.extend(inference.warnings.iter().cloned());

        // 3. Aggregate
        let aggregator = Aggregator::with_unknown_label(&self.config.unknown_organization_label);
        let aggregation = aggregator.aggregate(&inference.appointments);
        warnings.extend(aggregation.warnings.iter().cloned());
        let (rates, rate_warnings) = aggregator.rates(&aggregation.counts);
        warnings.extend(rate_warnings);

        // 4. Leaders
        let selection = YearlyLeaderSelector::new(self.config.min_appointments)
            .select(&aggregation.counts, self.config.years());
        warnings.extend(selection.warnings);

        // 5. Annual proportions (integrity failure aborts the run)
        let annual = AnnualProportionCalculator::new(self.config.year_start, self.config.year_end)?
            .calculate(&inference.appointments, &aggregation.counts)?;
        warnings.extend(annual.warnings);

        // 6. Trend (failure here is confined to the trend)
        let regression = match TrendAnalyzer::from_config(&self.config).analyze(&annual.proportions)
        {
            Ok(analysis) => {
                warnings.extend(analysis.warnings);
                Some(analysis.result)
            }
            Err(e) => {
                warn!(error = %e, "trend analysis failed");
                warnings.push(RunWarning::TrendUnavailable {
                    reason: e.to_string(),
                });
                None
            }
        };

        let report = AnalysisReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            config: self.config.clone(),
            appointments: inference.appointments,
            org_year_counts: aggregation.counts,
            rates,
            yearly_leaders: selection.leaders,
            annual_proportions: annual.proportions,
            regression,
            warnings,
        };

        info!("{}", report.summary());
        Ok(report)
    }
}

/// Whole-input checks: fatal before any stage runs
fn check_structure(records: &[AppointmentRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    if records.iter().all(|r| r.year.is_none()) {
        return Err(AnalysisError::MissingField {
            field: "year".to_string(),
        });
    }
    let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());
    if !records
        .iter()
        .any(|r| present(&r.person_name) || present(&r.position) || present(&r.organization))
    {
        return Err(AnalysisError::MissingField {
            field: "name/position/organization".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::ReappointedFlag;

    fn create_test_config() -> AnalysisConfig {
        AnalysisConfig {
            year_start: 2015,
            year_end: 2018,
            min_appointments: 2,
            ..AnalysisConfig::default()
        }
    }

    fn create_test_records() -> Vec<AppointmentRecord> {
        let mut records = Vec::new();
        for (year, names) in [
            (2015, vec!["Ann", "Bob", "Cy", "Di"]),
            (2016, vec!["Ann", "Eve", "Fay", "Gus"]),
            (2017, vec!["Ann", "Bob", "Hal", "Ivy"]),
            (2018, vec!["Ann", "Bob", "Eve", "Jo"]),
        ] {
            for name in names {
                records.push(AppointmentRecord::new(
                    name,
                    "Director",
                    "Health Agency",
                    Some(year),
                    ReappointedFlag::False,
                ));
            }
        }
        records
    }

    #[test]
    fn test_end_to_end_counts() {
        let pipeline = ReappointmentPipeline::new(create_test_config()).unwrap();
        let report = pipeline.run(&create_test_records()).unwrap();

        let proportions: Vec<u64> = report
            .annual_proportions
            .iter()
            .map(|p| p.total_reappointments)
            .collect();
        // 2016: Ann; 2017: Ann, Bob; 2018: Ann, Bob, Eve
        assert_eq!(proportions, vec![0, 1, 2, 3]);
        assert_eq!(report.yearly_leaders.len(), 4);

        let regression = report.regression.as_ref().unwrap();
        assert!((regression.slope - 0.25).abs() < 1e-10);
        assert_eq!(report.reappointment_count(), 6);
        assert_eq!(report.inferred_count(), 6);
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let pipeline = ReappointmentPipeline::new(create_test_config()).unwrap();
        assert_eq!(pipeline.run(&[]).unwrap_err(), AnalysisError::EmptyInput);
    }

    #[test]
    fn test_no_years_is_fatal() {
        let pipeline = ReappointmentPipeline::new(create_test_config()).unwrap();
        let records = vec![AppointmentRecord::new("Ann", "Chair", "Board", None, ReappointedFlag::True)];
        assert_eq!(
            pipeline.run(&records).unwrap_err(),
            AnalysisError::MissingField {
                field: "year".to_string()
            }
        );
    }

    #[test]
    fn test_short_range_reports_trend_unavailable() {
        let config = AnalysisConfig {
            year_start: 2015,
            year_end: 2016,
            ..create_test_config()
        };
        let pipeline = ReappointmentPipeline::new(config).unwrap();
        let report = pipeline.run(&create_test_records()).unwrap();

        assert!(report.regression.is_none());
        assert_eq!(report.annual_proportions.len(), 2);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, RunWarning::TrendUnavailable { .. })));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, RunWarning::RecordsOutsideYearRange { count: 8, .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            year_start: 2020,
            year_end: 2010,
            ..AnalysisConfig::default()
        };
        assert!(ReappointmentPipeline::new(config).is_err());
    }

    #[test]
    fn test_report_serializes() {
        let pipeline = ReappointmentPipeline::new(create_test_config()).unwrap();
        let report = pipeline.run(&create_test_records()).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.annual_proportions, report.annual_proportions);
    }
}
