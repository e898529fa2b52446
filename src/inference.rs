// 🔁 Reappointment Inference - who has been appointed here before?
// Groups records by identity key, orders each group by year and marks
// every member after the chronologically first one as a reappointment.
//
// Reconciliation with the source flag:
//   final = source_flag OR inferred
// An explicit source `True` is never downgraded.

use crate::appointment::{AppointmentRecord, ReappointedFlag};
use crate::normalize::{IdentityKey, IdentityNormalizer};
use crate::warnings::RunWarning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ============================================================================
// INFERRED APPOINTMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredAppointment {
    /// Position in the input sequence (the stable tie-break)
    pub index: usize,

    /// Record exactly as ingested; the source flag is preserved here
    pub record: AppointmentRecord,

    /// `None` when the record could not be matched at all
    pub key: Option<IdentityKey>,

    /// True when an earlier appointment with the same key exists
    pub inferred: bool,

    /// Reconciled flag: source `True` or inferred → `True`, otherwise the source value
    pub reappointed: ReappointedFlag,
}

impl InferredAppointment {
    pub fn is_reappointment(&self) -> bool {
        self.reappointed.is_true()
    }

    /// Copy of the source record carrying the reconciled flag
    pub fn corrected_record(&self) -> AppointmentRecord {
        self.record.clone().with_flag(self.reappointed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub appointments: Vec<InferredAppointment>,

    /// Number of identity groups with at least one dated member
    pub group_count: usize,

    /// Records newly marked by inference (source flag was not `True`)
    pub newly_flagged: usize,

    pub warnings: Vec<RunWarning>,
}

impl InferenceOutcome {
    pub fn corrected_records(&self) -> Vec<AppointmentRecord> {
        self.appointments.iter().map(|a| a.corrected_record()).collect()
    }

    pub fn reappointment_count(&self) -> usize {
        self.appointments.iter().filter(|a| a.is_reappointment()).count()
    }
}

// ============================================================================
// INFERER
// ============================================================================

pub struct ReappointmentInferer {
    normalizer: IdentityNormalizer,
}

impl ReappointmentInferer {
    pub fn new(normalizer: IdentityNormalizer) -> Self {
        ReappointmentInferer { normalizer }
    }

    pub fn infer(&self, records: &[AppointmentRecord]) -> InferenceOutcome {
        let mut groups: BTreeMap<IdentityKey, Vec<(usize, i32)>> = BTreeMap::new();
        let mut keys = Vec::with_capacity(records.len());
        let mut without_year = 0;
        let mut unmatchable = 0;

        for (index, record) in records.iter().enumerate() {
            let key = self.normalizer.key_for(record);

            if record.year.is_none() {
                without_year += 1;
            }
            match (&key, record.year) {
                (Some(k), Some(year)) => groups.entry(k.clone()).or_default().push((index, year)),
                (None, _) => unmatchable += 1,
                (Some(_), None) => {}
            }
            keys.push(key);
        }

        let mut inferred = vec![false; records.len()];
        for members in groups.values_mut() {
            // Stable: equal years keep input order
            members.sort_by_key(|&(_, year)| year);
            for &(index, _) in members.iter().skip(1) {
                inferred[index] = true;
            }
        }

        let mut newly_flagged = 0;
        let appointments: Vec<InferredAppointment> = records
            .iter()
            .zip(keys)
            .enumerate()
            .map(|(index, (record, key))| {
                let reappointed = if record.reappointed.is_true() || inferred[index] {
                    ReappointedFlag::True
                } else {
                    record.reappointed
                };
                if inferred[index] && !record.reappointed.is_true() {
                    newly_flagged += 1;
                }
                InferredAppointment {
                    index,
                    record: record.clone(),
                    key,
                    inferred: inferred[index],
                    reappointed,
                }
            })
            .collect();

        let mut warnings = Vec::new();
        if without_year > 0 {
            warn!(count = without_year, "records without a usable year excluded from grouping");
            warnings.push(RunWarning::RecordsWithoutYear {
                count: without_year,
            });
        }
        if unmatchable > 0 {
            warn!(count = unmatchable, "records with an empty identity treated as standalone");
            warnings.push(RunWarning::UnmatchableIdentity { count: unmatchable });
        }

        debug!(
            records = records.len(),
            groups = groups.len(),
            newly_flagged,
            "reappointment inference complete"
        );

        InferenceOutcome {
            appointments,
            group_count: groups.len(),
            newly_flagged,
            warnings,
        }
    }
}

impl Default for ReappointmentInferer {
    fn default() -> Self {
        Self::new(IdentityNormalizer::new())
    }
}

// ============================================================================
// TESTS
// ============================================================================
