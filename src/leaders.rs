// 🏆 Yearly Leader Selection - which organization reappointed most, each year?
// Deterministic ordering: rate desc → total appointments desc → name asc

use crate::aggregate::OrgYearCount;
use crate::warnings::RunWarning;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ============================================================================
// LEADER RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contender {
    pub organization: String,
    pub rate: f64,
    pub total_appointments: u64,
    pub reappointment_count: u64,
}

impl Contender {
    fn from_count(count: &OrgYearCount) -> Self {
        Contender {
            organization: count.organization.clone(),
            rate: count.rate(),
            total_appointments: count.total_appointments,
            reappointment_count: count.reappointment_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyLeader {
    pub year: i32,
    pub winner: Contender,
    pub runner_up: Option<Contender>,

    /// winner.rate - runner_up.rate (None without a runner-up)
    pub margin: Option<f64>,

    /// Organizations that met the threshold this year
    pub eligible_organizations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderSelection {
    pub leaders: Vec<YearlyLeader>,
    pub omitted_years: Vec<i32>,
    pub warnings: Vec<RunWarning>,
}

// ============================================================================
// SELECTOR
// ============================================================================

pub struct YearlyLeaderSelector {
    /// Minimum appointments an organization needs in a year to be eligible
    pub min_appointments: u64,
}

impl YearlyLeaderSelector {
    pub fn new(min_appointments: u64) -> Self {
        YearlyLeaderSelector { min_appointments }
    }

    /// Pick a leader for every year in `years`. Years where nobody meets the
    /// threshold are omitted and reported.
    pub fn select<I>(&self, counts: &[OrgYearCount], years: I) -> LeaderSelection
    where
        I: IntoIterator<Item = i32>,
    {
        let mut by_year: BTreeMap<i32, Vec<Contender>> = BTreeMap::new();
        for count in counts {
            if count.total_appointments >= self.min_appointments {
                by_year
                    .entry(count.year)
                    .or_default()
                    .push(Contender::from_count(count));
            }
        }

        let mut leaders = Vec::new();
        let mut omitted_years = Vec::new();
        let mut warnings = Vec::new();

        for year in years {
            let mut contenders = by_year.remove(&year).unwrap_or_default();
            if contenders.is_empty() {
                warn!(year, min_appointments = self.min_appointments, "no eligible organization");
                omitted_years.push(year);
                warnings.push(RunWarning::LeaderYearOmitted {
                    year,
                    min_appointments: self.min_appointments,
                });
                continue;
            }

            contenders.sort_by(rank);
            let eligible_organizations = contenders.len();
            let mut ranked = contenders.into_iter();
            let Some(winner) = ranked.next() else {
                continue;
            };
            let runner_up = ranked.next();
            let margin = runner_up.as_ref().map(|r| winner.rate - r.rate);

            debug!(year, organization = %winner.organization, rate = winner.rate, "yearly leader");
            leaders.push(YearlyLeader {
                year,
                winner,
                runner_up,
                margin,
                eligible_organizations,
            });
        }

        LeaderSelection {
            leaders,
            omitted_years,
            warnings,
        }
    }
}

/// Best first: higher rate, then more appointments, then smaller name
fn rank(a: &Contender, b: &Contender) -> Ordering {
    b.rate
        .total_cmp(&a.rate)
        .then_with(|| b.total_appointments.cmp(&a.total_appointments))
        .then_with(|| a.organization.cmp(&b.organization))
}

// ============================================================================
// TESTS
// ============================================================================
