use bevy_ecs::prelude::World;
use clinic_core::runner::{initialize_simulation, run_scenario, run_until_empty, simulation_schedule};
use clinic_core::scenario::{build_scenario, ClinicParams};
use clinic_core::spawner::{ArrivalGenerator, ArrivalMode, ArrivalSchedule};
use clinic_core::telemetry::PatientLog;

#[test]
fn poisson_arrivals_average_the_hourly_rate() {
    let runs = 200;
    let mut total = 0usize;
    for seed in 1..=runs {
        let params = ClinicParams::default()
            .with_seed(seed)
            .with_arrival_rates(ArrivalSchedule::constant(10.0, 1))
            .with_stop_time(1.0);
        let outcome = run_scenario(params).expect("valid params");
        assert!(outcome.records.iter().all(|r| r.arrival_ts <= 1.0));
        total += outcome.records.len();
    }
    let mean = total as f64 / runs as f64;
    assert!((mean - 10.0).abs() < 1.0, "mean arrivals {mean}");
}

#[test]
fn patient_cap_limits_spawns() {
    let params = ClinicParams::default().with_seed(3).with_max_patients(5);
    let outcome = run_scenario(params).expect("valid params");
    assert_eq!(outcome.records.len(), 5);
    let mut ids: Vec<u64> = outcome.records.iter().map(|r| r.patient_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn hourly_quota_never_exceeds_first_hour_quota() {
    for seed in 1..=50 {
        let params = ClinicParams::default()
            .with_seed(seed)
            .with_arrival_rates(ArrivalSchedule(vec![3.0, 3.0]))
            .with_arrival_mode(ArrivalMode::HourlyQuota)
            .with_stop_time(2.0);
        let outcome = run_scenario(params).expect("valid params");
        let first_hour = outcome
            .records
            .iter()
            .filter(|r| r.arrival_ts < 1.0)
            .count();
        assert!(first_hour <= 3, "seed {seed}: {first_hour} arrivals in hour 0");
    }
}

#[test]
fn generator_count_matches_logged_patients() {
    let mut world = World::new();
    let params = ClinicParams::default().with_seed(9).with_stop_time(4.0);
    build_scenario(&mut world, params).expect("valid params");
    initialize_simulation(&mut world);
    let mut schedule = simulation_schedule();
    run_until_empty(&mut world, &mut schedule, 1_000_000);

    let generator = world.resource::<ArrivalGenerator>();
    assert_eq!(generator.stop_time(), 4.0);
    assert!(generator.spawned_count() > 0);
    let logged = world.resource::<PatientLog>().len() as u64;
    assert_eq!(generator.spawned_count(), logged);
}
