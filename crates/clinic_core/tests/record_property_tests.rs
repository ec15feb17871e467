use std::collections::HashSet;

use clinic_core::pathway::{expected_stations, Station};
use clinic_core::runner::run_scenario;
use clinic_core::scenario::{ClinicParams, WorkflowPolicy};
use proptest::prelude::*;

fn policy_strategy() -> impl Strategy<Value = WorkflowPolicy> {
    prop_oneof![
        Just(WorkflowPolicy::baseline()),
        Just(WorkflowPolicy::same_visit()),
        Just(WorkflowPolicy::dedicated(false)),
        Just(WorkflowPolicy::dedicated(true)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_record_is_consistent_with_its_pathway(
        seed in 1u64..=1000,
        policy in policy_strategy(),
    ) {
        let params = ClinicParams::for_workflow(policy)
            .with_seed(seed)
            .with_stop_time(2.0);
        let outcome = run_scenario(params).expect("valid params");

        let mut ids = HashSet::new();
        for record in &outcome.records {
            prop_assert!(ids.insert(record.patient_id));
            prop_assert!(record.exit_ts >= record.arrival_ts);
            for (station, visit) in record.visits.visited() {
                let got = visit.got.unwrap_or(f64::NAN);
                let release = visit.release.unwrap_or(f64::NAN);
                prop_assert!(release >= got, "{} released before got", station.name());
                prop_assert!(got >= record.arrival_ts && release <= record.exit_ts);
            }
            let visited: HashSet<Station> = record.visits.visited().map(|(s, _)| s).collect();
            let expected: HashSet<Station> =
                expected_stations(record.patient_type, &policy).into_iter().collect();
            prop_assert_eq!(visited, expected);
        }
    }
}
