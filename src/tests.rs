use crate::equilibrium::{correlation, occupancy, Tracker};
use crate::matrix::DispersalMatrix;
use crate::patches::{population_from_area, Patches};
use crate::submodels::{demography, dispersal};
use crate::sweep::{run_sweep, Scenario};
use crate::{run, step, ConfigError, Parameters, RunOutcome, State, TimeStep};

use bitvec::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;

/// Three patches in a closed loop, each sending 90% of its dispersers to
/// the next patch and losing the rest.
fn loop_matrix() -> DispersalMatrix {
    DispersalMatrix::from_dense(&[
        vec![0.0, 0.0, 0.9],
        vec![0.9, 0.0, 0.0],
        vec![0.0, 0.9, 0.0],
    ])
    .unwrap()
}

fn loop_state(capacity: Vec<f64>) -> State {
    State::new(
        vec![1000.0, 1000.0, 1000.0],
        capacity,
        loop_matrix().augment().unwrap(),
    )
    .unwrap()
}

fn ring_scenario(dispersal_proportion: f64, mortality: f64) -> Scenario {
    Scenario {
        variant: "ring".to_string(),
        dispersal_proportion,
        mortality,
    }
}

fn short_params(timesteps: TimeStep) -> Parameters {
    Parameters {
        timesteps,
        sample_stride: 5,
        log_every: 0,
        seed: 42,
        remove_retention: false,
    }
}

#[test]
fn augmented_columns_sum_to_one() {
    let matrix = DispersalMatrix::from_dense(&[
        vec![0.1, 0.0, 0.9],
        vec![0.4, 0.2, 0.0],
        vec![0.0, 0.3, 0.05],
    ])
    .unwrap();
    let augmented = matrix.augment().unwrap();
    for j in 0..augmented.size() {
        let column = augmented.column(j);
        assert_eq!(column.len(), augmented.size() + 1);
        let mass: f64 = column.iter().sum();
        assert!((mass - 1.0).abs() < 1e-12, "column {} sums to {}", j, mass);
        assert!(column.iter().all(|&p| p >= 0.0));
    }
}

#[test]
fn augment_rejects_overfull_columns() {
    let matrix = DispersalMatrix::from_dense(&[vec![0.6, 0.6], vec![0.6, 0.6]]).unwrap();
    assert!(matches!(
        matrix.augment(),
        Err(ConfigError::ColumnMass { .. })
    ));
}

#[test]
fn non_square_input_is_rejected() {
    assert!(matches!(
        DispersalMatrix::from_dense(&[vec![0.0, 0.1], vec![0.2]]),
        Err(ConfigError::NonSquare { .. })
    ));
}

#[test]
fn negative_weight_is_rejected() {
    assert!(matches!(
        DispersalMatrix::from_dense(&[vec![0.0, -0.1], vec![0.2, 0.0]]),
        Err(ConfigError::InvalidWeight { .. })
    ));
}

#[test]
fn edges_build_against_sorted_ids() {
    let ids = [3, 7, 9];
    let matrix =
        DispersalMatrix::from_edges(&ids, vec![(7, 3, 0.5), (9, 9, 0.25)]).unwrap();
    assert_eq!(matrix.get(0, 1), 0.5);
    assert_eq!(matrix.get(2, 2), 0.25);
    assert_eq!(matrix.get(1, 0), 0.0);

    assert!(matches!(
        DispersalMatrix::from_edges(&ids, vec![(4, 3, 0.5)]),
        Err(ConfigError::UnknownPatch { id: 4 })
    ));
}

#[test]
fn zero_diagonal_removes_retention() {
    let mut matrix = DispersalMatrix::from_dense(&[vec![0.3, 0.1], vec![0.1, 0.4]]).unwrap();
    matrix.zero_diagonal();
    assert_eq!(matrix.get(0, 0), 0.0);
    assert_eq!(matrix.get(1, 1), 0.0);
    assert_eq!(matrix.get(1, 0), 0.1);
}

#[test]
fn routing_conserves_dispersers() {
    let mut rng = SmallRng::seed_from_u64(7);
    let augmented = loop_matrix().augment().unwrap();
    let counts = dispersal::route(augmented.column(0), 10_000, &mut rng);
    assert_eq!(counts.iter().sum::<u64>(), 10_000);

    let none = dispersal::route(augmented.column(0), 0, &mut rng);
    assert!(none.iter().all(|&c| c == 0));

    // All probability mass on the last destination: every disperser lands there.
    let all_lost = dispersal::route(&[0.0, 0.0, 1.0], 500, &mut rng);
    assert_eq!(all_lost, vec![0, 0, 500]);
}

#[test]
fn zero_expectation_draws_zero() {
    let mut rng = SmallRng::seed_from_u64(7);
    assert_eq!(demography::poisson(0.0, &mut rng), 0);
}

#[test]
fn population_stays_within_bounds() {
    let mut state = loop_state(vec![1000.0, 1000.0, 1000.0]);
    let scenario = ring_scenario(0.5, 0.1);
    let mut rng = SmallRng::seed_from_u64(3);
    for _ in 0..50 {
        step(&mut state, &scenario, &mut rng);
        for (i, &n) in state.population.iter().enumerate() {
            assert!(n >= 0.0);
            assert!(n <= state.capacity[i]);
        }
    }
}

#[test]
fn zero_capacity_patch_stays_empty() {
    let mut state = loop_state(vec![1000.0, 0.0, 1000.0]);
    let scenario = ring_scenario(0.5, 0.1);
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..100 {
        step(&mut state, &scenario, &mut rng);
        assert_eq!(state.population[1], 0.0);
    }
}

#[test]
fn closed_loop_sustains_population() {
    let mut state = loop_state(vec![1000.0, 1000.0, 1000.0]);
    let scenario = ring_scenario(0.5, 0.1);
    let mut rng = SmallRng::seed_from_u64(1);
    let outcome = run(&mut state, &scenario, &short_params(200), &mut rng);
    assert!(outcome.occupancy.all());
}

#[test]
fn isolated_patch_dies_out() {
    // No outgoing edges: the column loses every disperser it produces.
    let matrix = DispersalMatrix::from_dense(&[vec![0.0]]).unwrap();
    let mut state = State::new(vec![10.0], vec![10.0], matrix.augment().unwrap()).unwrap();
    let scenario = Scenario {
        variant: "isolated".to_string(),
        dispersal_proportion: 1.0,
        mortality: 0.5,
    };
    let mut rng = SmallRng::seed_from_u64(1);
    let outcome = run(&mut state, &scenario, &short_params(50), &mut rng);
    assert!(!outcome.occupancy[0]);
    assert_eq!(state.population[0], 0.0);
}

#[test]
fn no_loss_population_is_sustained() {
    // Full retention, no mortality, unbounded capacity: the only remaining
    // dynamics are the Poisson draws, and the expectation cannot decrease.
    let matrix = DispersalMatrix::from_dense(&[vec![1.0]]).unwrap();
    let mut state = State::new(vec![100_000.0], vec![1e12], matrix.augment().unwrap()).unwrap();
    let scenario = Scenario {
        variant: "closed".to_string(),
        dispersal_proportion: 0.001,
        mortality: 0.0,
    };
    let mut rng = SmallRng::seed_from_u64(5);
    run(&mut state, &scenario, &short_params(200), &mut rng);
    assert!(state.population[0] >= 80_000.0);
}

#[test]
fn fixed_seed_reproduces_runs() {
    let scenario = ring_scenario(0.3, 0.2);
    let p = short_params(100);
    let mut first_rng = SmallRng::seed_from_u64(99);
    let mut second_rng = SmallRng::seed_from_u64(99);
    let first = run(
        &mut loop_state(vec![1000.0, 1000.0, 1000.0]),
        &scenario,
        &p,
        &mut first_rng,
    );
    let second = run(
        &mut loop_state(vec![1000.0, 1000.0, 1000.0]),
        &scenario,
        &p,
        &mut second_rng,
    );
    assert_eq!(first, second);
}

#[test]
fn correlation_of_identical_patterns_is_one() {
    let pattern = bitvec![1, 1, 1, 0];
    assert_eq!(correlation(&pattern, &pattern), 1.0);
}

#[test]
fn zero_variance_correlation_falls_back_to_one() {
    let saturated = bitvec![1, 1, 1, 1];
    assert_eq!(correlation(&saturated, &saturated), 1.0);
    let empty = bitvec![0, 0, 0];
    assert_eq!(correlation(&empty, &empty), 1.0);
    let mixed = bitvec![1, 0, 1, 0];
    assert_eq!(correlation(&saturated, &mixed), 1.0);
}

#[test]
fn correlation_detects_pattern_changes() {
    let a = bitvec![1, 0];
    let b = bitvec![0, 1];
    assert_eq!(correlation(&a, &b), -1.0);
    let c = bitvec![1, 1, 0, 0];
    let d = bitvec![1, 0, 1, 0];
    assert_eq!(correlation(&c, &d), 0.0);
}

#[test]
fn occupancy_marks_positive_populations() {
    assert_eq!(occupancy(&[0.0, 2.0, 0.5]), bitvec![0, 1, 1]);
}

#[test]
fn tracker_samples_on_the_stride() {
    let mut tracker = Tracker::new(5);
    tracker.observe(0, &[1.0, 0.0]);
    tracker.observe(3, &[0.0, 0.0]);
    tracker.observe(5, &[1.0, 1.0]);
    tracker.observe(7, &[0.0, 0.0]);
    tracker.observe(10, &[1.0, 0.0]);
    let steps: Vec<TimeStep> = tracker.samples().iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![5, 10]);
    assert_eq!(tracker.samples()[0].correlation, 1.0);
    assert_eq!(tracker.samples()[0].proportion_occupied, 1.0);
    assert_eq!(tracker.samples()[1].proportion_occupied, 0.5);
}

#[test]
fn scenario_labels_follow_the_naming_scheme() {
    assert_eq!(
        Scenario {
            variant: "probavg_BASE".to_string(),
            dispersal_proportion: 0.25,
            mortality: 0.15,
        }
        .label(),
        "probavg_BASE_prop025_m15"
    );
    assert_eq!(ring_scenario(0.5, 0.1).label(), "ring_prop05_m1");
    assert_eq!(ring_scenario(1.0, 0.0).label(), "ring_prop1_m0");
}

#[test]
fn scenario_validation_bounds() {
    assert!(matches!(
        ring_scenario(0.0, 0.1).validate(),
        Err(ConfigError::DispersalProportion(_))
    ));
    assert!(matches!(
        ring_scenario(1.2, 0.1).validate(),
        Err(ConfigError::DispersalProportion(_))
    ));
    assert!(matches!(
        ring_scenario(0.5, 1.0).validate(),
        Err(ConfigError::Mortality(_))
    ));
    assert!(matches!(
        ring_scenario(0.5, -0.1).validate(),
        Err(ConfigError::Mortality(_))
    ));
    assert!(ring_scenario(1.0, 0.0).validate().is_ok());
}

#[test]
fn scenario_seeds_are_stable() {
    let scenario = ring_scenario(0.5, 0.1);
    assert_eq!(scenario.seed(1), scenario.seed(1));
    assert_ne!(scenario.seed(1), scenario.seed(2));
    let other = Scenario {
        variant: "other".to_string(),
        ..scenario.clone()
    };
    assert_ne!(scenario.seed(1), other.seed(1));
}

fn ring_patches() -> Patches {
    Patches::new(vec![
        (0, 1000.0, 1000.0),
        (1, 1000.0, 1000.0),
        (2, 1000.0, 1000.0),
    ])
    .unwrap()
}

#[test]
fn sweep_covers_the_grid() {
    let variants = vec![("ring".to_string(), loop_matrix())];
    let results = run_sweep(
        &variants,
        &ring_patches(),
        &[0.5, 0.25],
        &[0.1],
        &short_params(50),
    )
    .unwrap();
    assert_eq!(results.patch_ids, vec![0, 1, 2]);
    assert_eq!(results.outcomes.len(), 2);
    assert!(results.outcomes.contains_key("ring_prop05_m1"));
    assert!(results.outcomes.contains_key("ring_prop025_m1"));
}

#[test]
fn sweep_is_deterministic() {
    let variants = vec![("ring".to_string(), loop_matrix())];
    let patches = ring_patches();
    let p = short_params(50);
    let first = run_sweep(&variants, &patches, &[0.5, 0.3], &[0.1, 0.2], &p).unwrap();
    let second = run_sweep(&variants, &patches, &[0.5, 0.3], &[0.1, 0.2], &p).unwrap();
    assert_eq!(first, second);
}

#[test]
fn malformed_variant_is_scoped_to_its_scenarios() {
    let overfull = DispersalMatrix::from_dense(&[
        vec![0.6, 0.6, 0.6],
        vec![0.6, 0.6, 0.6],
        vec![0.6, 0.6, 0.6],
    ])
    .unwrap();
    let variants = vec![
        ("ring".to_string(), loop_matrix()),
        ("overfull".to_string(), overfull),
    ];
    let results = run_sweep(
        &variants,
        &ring_patches(),
        &[0.5],
        &[0.1],
        &short_params(50),
    )
    .unwrap();
    assert_eq!(results.outcomes.len(), 1);
    assert!(results.outcomes.contains_key("ring_prop05_m1"));
}

#[test]
fn out_of_range_rates_are_scoped_to_their_scenarios() {
    let variants = vec![("ring".to_string(), loop_matrix())];
    let results = run_sweep(
        &variants,
        &ring_patches(),
        &[0.5, 1.7],
        &[0.1],
        &short_params(50),
    )
    .unwrap();
    assert_eq!(results.outcomes.len(), 1);
    assert!(results.outcomes.contains_key("ring_prop05_m1"));
}

#[test]
fn patch_count_mismatch_aborts_the_sweep() {
    let patches = Patches::new(vec![(0, 1000.0, 1000.0), (1, 1000.0, 1000.0)]).unwrap();
    let variants = vec![("ring".to_string(), loop_matrix())];
    assert!(matches!(
        run_sweep(&variants, &patches, &[0.5], &[0.1], &short_params(50)),
        Err(ConfigError::PatchMismatch { .. })
    ));
}

#[test]
fn patch_table_is_sorted_and_validated() {
    let patches = Patches::new(vec![(5, 10.0, 10.0), (2, 3.0, 1.0)]).unwrap();
    assert_eq!(patches.ids, vec![2, 5]);
    assert_eq!(patches.capacity, vec![3.0, 10.0]);
    assert_eq!(patches.population, vec![1.0, 10.0]);

    assert!(matches!(
        Patches::new(vec![(2, 1.0, 1.0), (2, 1.0, 1.0)]),
        Err(ConfigError::DuplicatePatch { id: 2 })
    ));
    assert!(matches!(
        Patches::new(vec![(0, -1.0, 1.0)]),
        Err(ConfigError::InvalidCapacity { .. })
    ));
    assert!(matches!(
        Patches::new(vec![(0, 1.0, -1.0)]),
        Err(ConfigError::InvalidPopulation { .. })
    ));
}

#[test]
fn area_seeding_rule() {
    assert_eq!(
        population_from_area(&[200.0, 100.0, 0.001]),
        vec![1.0e7, 5.0e6, 1000.0]
    );
    assert_eq!(population_from_area(&[]), Vec::<f64>::new());
    assert_eq!(population_from_area(&[0.0, 0.0]), vec![0.0, 0.0]);
}

#[test]
fn occupancy_serializes_as_bits() {
    let outcome = RunOutcome {
        occupancy: bitvec![1, 0, 1],
        series: Vec::new(),
    };
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["occupancy"], json!([1, 0, 1]));
    let back: RunOutcome = serde_json::from_value(value).unwrap();
    assert_eq!(back, outcome);
}
