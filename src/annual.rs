// 📅 Annual Proportions - government-wide reappointment share per year
// Recomputed from raw record counts, never by averaging organization rates,
// then cross-checked against the per-organization totals.

use crate::aggregate::OrgYearCount;
use crate::error::{AnalysisError, Result};
use crate::inference::InferredAppointment;
use crate::warnings::RunWarning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualProportion {
    pub year: i32,
    pub total_appointments: u64,
    pub total_reappointments: u64,
    pub proportion: f64,
}

impl AnnualProportion {
    pub fn new(year: i32, total_appointments: u64, total_reappointments: u64) -> Self {
        let proportion = if total_appointments == 0 {
            0.0
        } else {
            total_reappointments as f64 / total_appointments as f64
        };
        AnnualProportion {
            year,
            total_appointments,
            total_reappointments,
            proportion,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualSeries {
    /// One entry per configured year, ascending, zero-filled
    pub proportions: Vec<AnnualProportion>,
    pub warnings: Vec<RunWarning>,
}

impl AnnualSeries {
    /// (year, proportion) points for trend fitting
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.proportions
            .iter()
            .map(|p| (p.year as f64, p.proportion))
            .collect()
    }
}

pub struct AnnualProportionCalculator {
    pub year_start: i32,
    pub year_end: i32,
}

impl AnnualProportionCalculator {
    pub fn new(year_start: i32, year_end: i32) -> Result<Self> {
        if year_start > year_end {
            return Err(AnalysisError::InvalidYearRange {
                start: year_start,
                end: year_end,
            });
        }
        Ok(AnnualProportionCalculator {
            year_start,
            year_end,
        })
    }

    /// Roll up every dated record into its year, then verify each year's
    /// total against the sum of `org_counts` for that year.
    pub fn calculate(
        &self,
        appointments: &[InferredAppointment],
        org_counts: &[OrgYearCount],
    ) -> Result<AnnualSeries> {
        let mut direct: BTreeMap<i32, (u64, u64)> = BTreeMap::new();
        let mut outside_range = 0;

        for appointment in appointments {
            let Some(year) = appointment.record.year else {
                continue;
            };
            if !(self.year_start..=self.year_end).contains(&year) {
                outside_range += 1;
                continue;
            }
            let entry = direct.entry(year).or_insert((0, 0));
            entry.0 += 1;
            if appointment.is_reappointment() {
                entry.1 += 1;
            }
        }

        let mut org_totals: BTreeMap<i32, u64> = BTreeMap::new();
        for count in org_counts {
            *org_totals.entry(count.year).or_insert(0) += count.total_appointments;
        }

        let mut proportions = Vec::new();
        for year in self.year_start..=self.year_end {
            let (total, reappointed) = direct.get(&year).copied().unwrap_or((0, 0));
            let org_total = org_totals.get(&year).copied().unwrap_or(0);
            if org_total != total {
                return Err(AnalysisError::IntegrityMismatch {
                    year,
                    org_total,
                    direct_total: total,
                });
            }
            proportions.push(AnnualProportion::new(year, total, reappointed));
        }

        let mut warnings = Vec::new();
        if outside_range > 0 {
            warn!(
                count = outside_range,
                start = self.year_start,
                end = self.year_end,
                "records outside configured year range"
            );
            warnings.push(RunWarning::RecordsOutsideYearRange {
                count: outside_range,
                start: self.year_start,
                end: self.year_end,
            });
        }

        debug!(years = proportions.len(), "annual proportions computed");
        Ok(AnnualSeries {
            proportions,
            warnings,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
