// 📊 Aggregator - organization × year appointment and reappointment counts
// One row per (organization, year) actually observed; no zero rows are synthesized.

use crate::inference::InferredAppointment;
use crate::normalize::{collapse_whitespace, normalize_text};
use crate::warnings::RunWarning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const UNKNOWN_ORGANIZATION: &str = "Unknown Organization";

// ============================================================================
// ORG-YEAR COUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgYearCount {
    pub organization: String,
    pub year: i32,
    pub total_appointments: u64,
    pub reappointment_count: u64,
}

impl OrgYearCount {
    /// reappointments / appointments, 0.0 for an empty org-year, never above 1.0
    pub fn rate(&self) -> f64 {
        if self.total_appointments == 0 {
            return 0.0;
        }
        (self.reappointment_count as f64 / self.total_appointments as f64).min(1.0)
    }

    pub fn exceeds_total(&self) -> bool {
        self.reappointment_count > self.total_appointments
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub organization: String,
    pub year: i32,
    pub rate: f64,
}

/// A single count column from an independently aggregated table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgYearTally {
    pub organization: String,
    pub year: i32,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationOutcome {
    /// Sorted by (organization, year)
    pub counts: Vec<OrgYearCount>,
    pub warnings: Vec<RunWarning>,
}

impl AggregationOutcome {
    /// Sum of appointments over all organizations for one year
    pub fn total_for_year(&self, year: i32) -> u64 {
        self.counts
            .iter()
            .filter(|c| c.year == year)
            .map(|c| c.total_appointments)
            .sum()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct Aggregator {
    /// Label for records without an organization (default: "Unknown Organization")
    pub unknown_organization_label: String,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_unknown_label(UNKNOWN_ORGANIZATION)
    }

    pub fn with_unknown_label(label: &str) -> Self {
        Aggregator {
            unknown_organization_label: label.to_string(),
        }
    }

    /// Display label for an organization; blank or missing maps to the sentinel
    pub fn organization_label(&self, organization: Option<&str>) -> String {
        let label = organization.map(collapse_whitespace).unwrap_or_default();
        if label.is_empty() {
            self.unknown_organization_label.clone()
        } else {
            label
        }
    }

    /// Count appointments and reconciled reappointments per (organization, year).
    /// Records without a year cannot be placed and are skipped here.
    pub fn aggregate(&self, appointments: &[InferredAppointment]) -> AggregationOutcome {
        let mut table = OrgYearTable::default();
        let mut unknown = 0;

        for appointment in appointments {
            let Some(year) = appointment.record.year else {
                continue;
            };
            let raw_org = appointment.record.organization.as_deref();
            if raw_org.map_or(true, |o| o.trim().is_empty()) {
                unknown += 1;
            }
            let cell = table.cell(self.organization_label(raw_org), year);
            cell.0 += 1;
            if appointment.is_reappointment() {
                cell.1 += 1;
            }
        }

        let counts = table.into_counts();

        let mut warnings = Vec::new();
        if unknown > 0 {
            warn!(count = unknown, label = %self.unknown_organization_label, "records without organization");
            warnings.push(RunWarning::UnknownOrganization {
                count: unknown,
                label: self.unknown_organization_label.clone(),
            });
        }

        debug!(org_years = counts.len(), "aggregation complete");
        AggregationOutcome { counts, warnings }
    }

    /// Join separately aggregated appointment and reappointment tables.
    /// Pairs where reappointments exceed appointments are capped and flagged.
    pub fn merge_counts(
        &self,
        totals: &[OrgYearTally],
        reappointments: &[OrgYearTally],
    ) -> AggregationOutcome {
        let mut table = OrgYearTable::default();

        for tally in totals {
            let label = self.organization_label(Some(tally.organization.as_str()));
            table.cell(label, tally.year).0 += tally.count;
        }
        for tally in reappointments {
            let label = self.organization_label(Some(tally.organization.as_str()));
            table.cell(label, tally.year).1 += tally.count;
        }

        let mut warnings = Vec::new();
        let mut counts = table.into_counts();
        for count in counts.iter_mut() {
            if count.exceeds_total() {
                warnings.push(clamp_warning(count));
                count.reappointment_count = count.total_appointments;
            }
        }

        AggregationOutcome { counts, warnings }
    }

    /// Derive rates. Any row whose reappointments exceed its appointments is
    /// clamped to 1.0 and reported.
    pub fn rates(&self, counts: &[OrgYearCount]) -> (Vec<RateRecord>, Vec<RunWarning>) {
        let mut warnings = Vec::new();
        let rates = counts
            .iter()
            .map(|count| {
                if count.exceeds_total() {
                    warnings.push(clamp_warning(count));
                }
                RateRecord {
                    organization: count.organization.clone(),
                    year: count.year,
                    rate: count.rate(),
                }
            })
            .collect();
        (rates, warnings)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Org-year cells keyed by the case-folded organization; the first label
/// seen for an organization is the one reported
#[derive(Default)]
struct OrgYearTable {
    labels: BTreeMap<String, String>,
    cells: BTreeMap<(String, i32), (u64, u64)>,
}

impl OrgYearTable {
    fn cell(&mut self, label: String, year: i32) -> &mut (u64, u64) {
        let key = normalize_text(&label);
        self.labels.entry(key.clone()).or_insert(label);
        self.cells.entry((key, year)).or_insert((0, 0))
    }

    /// Counts ordered by organization label, then year
    fn into_counts(self) -> Vec<OrgYearCount> {
        let labels = self.labels;
        let mut counts: Vec<OrgYearCount> = self
            .cells
            .into_iter()
            .map(|((key, year), (total, reappointed))| OrgYearCount {
                organization: labels.get(&key).cloned().unwrap_or(key),
                year,
                total_appointments: total,
                reappointment_count: reappointed,
            })
            .collect();
        counts.sort_by(|a, b| a.organization.cmp(&b.organization).then(a.year.cmp(&b.year)));
        counts
    }
}

fn clamp_warning(count: &OrgYearCount) -> RunWarning {
    warn!(
        organization = %count.organization,
        year = count.year,
        total = count.total_appointments,
        reappointments = count.reappointment_count,
        "reappointments exceed appointments, clamping rate"
    );
    RunWarning::RateClamped {
        organization: count.organization.clone(),
        year: count.year,
        total_appointments: count.total_appointments,
        reappointment_count: count.reappointment_count,
    }
}

// ============================================================================
// TESTS
// ============================================================================
