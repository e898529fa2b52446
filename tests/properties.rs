// Property tests for inference, aggregation and leader selection

use proptest::prelude::*;
use reappointment_trends::{
    AnnualProportionCalculator, AppointmentRecord, Aggregator, IdentityKey, IdentityNormalizer,
    InferredAppointment, OrgYearCount, ReappointedFlag, ReappointmentInferer,
    YearlyLeaderSelector,
};
use std::collections::BTreeMap;

const NAMES: [&str; 4] = ["Jane Smith", "Dr. Jane Smith", "John Roe", "Pat Poe"];
const POSITIONS: [&str; 2] = ["Chair", "Member"];
const ORGS: [&str; 3] = ["Health Agency", "Arts Council", ""];

fn record_strategy() -> impl Strategy<Value = AppointmentRecord> {
    (
        0..NAMES.len(),
        0..POSITIONS.len(),
        0..ORGS.len(),
        prop::option::weighted(0.9, 2013..2017i32),
        0..3u8,
    )
        .prop_map(|(name, position, org, year, flag)| {
            let flag = match flag {
                0 => ReappointedFlag::True,
                1 => ReappointedFlag::False,
                _ => ReappointedFlag::Unknown,
            };
            let mut record = AppointmentRecord::new(NAMES[name], POSITIONS[position], ORGS[org], year, flag);
            if ORGS[org].is_empty() {
                record.organization = None;
            }
            record
        })
}

fn records_strategy() -> impl Strategy<Value = Vec<AppointmentRecord>> {
    prop::collection::vec(record_strategy(), 0..40)
}

fn infer(records: &[AppointmentRecord]) -> Vec<InferredAppointment> {
    ReappointmentInferer::new(IdentityNormalizer::new())
        .infer(records)
        .appointments
}

fn inferred_per_key_year(appointments: &[InferredAppointment]) -> BTreeMap<(IdentityKey, i32), usize> {
    let mut counts = BTreeMap::new();
    for a in appointments {
        if let (Some(key), Some(year)) = (&a.key, a.record.year) {
            *counts.entry((key.clone(), year)).or_insert(0) += usize::from(a.inferred);
        }
    }
    counts
}

fn contender_count_strategy() -> impl Strategy<Value = Vec<OrgYearCount>> {
    prop::collection::btree_map((0..5usize, 2013..2016i32), (1..8u64, 0..8u64), 0..20).prop_map(|table| {
        table
            .into_iter()
            .map(|((org, year), (total, reappointed))| OrgYearCount {
                organization: format!("Org {}", org),
                year,
                total_appointments: total,
                reappointment_count: reappointed.min(total),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_group_marks_all_but_earliest(records in records_strategy()) {
        let appointments = infer(&records);

        let mut groups: BTreeMap<IdentityKey, Vec<&InferredAppointment>> = BTreeMap::new();
        for a in &appointments {
            if let (Some(key), Some(_)) = (&a.key, a.record.year) {
                groups.entry(key.clone()).or_default().push(a);
            }
        }

        for members in groups.values() {
            let inferred = members.iter().filter(|a| a.inferred).count();
            prop_assert_eq!(inferred, members.len() - 1);

            let earliest = members
                .iter()
                .min_by_key(|a| (a.record.year, a.index))
                .unwrap();
            prop_assert!(!earliest.inferred);
        }

        for a in &appointments {
            if a.key.is_none() || a.record.year.is_none() {
                prop_assert!(!a.inferred);
            }
            // Source true is never downgraded
            if a.record.reappointed.is_true() {
                prop_assert!(a.is_reappointment());
            }
        }
    }

    #[test]
    fn prop_inference_is_idempotent(records in records_strategy()) {
        let outcome = ReappointmentInferer::new(IdentityNormalizer::new()).infer(&records);
        let again = infer(&outcome.corrected_records());

        let first: Vec<_> = outcome.appointments.iter().map(|a| a.reappointed).collect();
        let second: Vec<_> = again.iter().map(|a| a.reappointed).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_inferred_counts_ignore_input_order(records in records_strategy()) {
        let forward = infer(&records);
        let reversed: Vec<_> = records.iter().rev().cloned().collect();
        let backward = infer(&reversed);

        prop_assert_eq!(inferred_per_key_year(&forward), inferred_per_key_year(&backward));
    }

    #[test]
    fn prop_counts_bounded_and_annual_totals_agree(records in records_strategy()) {
        let appointments = infer(&records);
        let aggregation = Aggregator::new().aggregate(&appointments);

        for count in &aggregation.counts {
            prop_assert!(count.reappointment_count <= count.total_appointments);
            prop_assert!((0.0..=1.0).contains(&count.rate()));
        }

        let dated = appointments.iter().filter(|a| a.record.year.is_some()).count() as u64;
        let counted: u64 = aggregation.counts.iter().map(|c| c.total_appointments).sum();
        prop_assert_eq!(dated, counted);

        let series = AnnualProportionCalculator::new(2013, 2016)
            .unwrap()
            .calculate(&appointments, &aggregation.counts)
            .unwrap();
        for p in &series.proportions {
            prop_assert_eq!(p.total_appointments, aggregation.total_for_year(p.year));
            prop_assert!(p.total_reappointments <= p.total_appointments);
        }
    }

    #[test]
    fn prop_leaders_ignore_input_order(counts in contender_count_strategy(), min in 1..4u64) {
        let selector = YearlyLeaderSelector::new(min);
        let forward = selector.select(&counts, 2013..=2015);

        let reversed: Vec<_> = counts.iter().rev().cloned().collect();
        let backward = selector.select(&reversed, 2013..=2015);

        prop_assert_eq!(&forward.leaders, &backward.leaders);
        prop_assert_eq!(&forward.omitted_years, &backward.omitted_years);
        prop_assert_eq!(forward.leaders.len() + forward.omitted_years.len(), 3);

        for leader in &forward.leaders {
            prop_assert!(leader.winner.total_appointments >= min);
            if let Some(margin) = leader.margin {
                prop_assert!(margin >= 0.0);
            }
        }
    }
}
