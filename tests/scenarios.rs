//! End-to-end scenario tests driving [`Simulation`] the way a caller
//! (CLI or batch runner) would: build a [`Config`], run it to completion,
//! inspect the [`RunSummary`] and recorded traces.

use platoon_formation_sim_core::config::{CollisionPolicy, Config, DepartMethod, FormationCentralizedKind, FormationStrategy};
use platoon_formation_sim_core::error::ConfigError;
use platoon_formation_sim_core::simulation::Simulation;

fn base_config() -> Config {
    let mut config = Config::default();
    config.road_length = 5_000.0;
    config.lanes = 2;
    config.time_limit = 400.0;
    config.step_length = 1.0;
    config.random_seed = 7;
    config.lane_changes = false;
    config
}

#[test]
fn human_only_vehicle_completes_without_platoon_involvement() {
    let mut config = base_config();
    config.vehicles = 1;
    config.penetration = 0.0;
    config.min_desired_speed = 25.0;
    config.max_desired_speed = 25.0;
    config.arrival_position = Some(2_000.0);

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.vehicles_arrived, 1);
    assert_eq!(summary.collisions_recorded, 0);
    assert!(!summary.cancelled);
}

#[test]
fn acc_only_fleet_runs_with_no_platoon_activity() {
    let mut config = base_config();
    config.vehicles = 10;
    config.penetration = 1.0;
    config.formation_strategy = FormationStrategy::Distributed;
    config.arrival_position = Some(4_500.0);

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.joins_committed, 0);
    assert!(!summary.cancelled);
}

#[test]
fn cacc_pair_started_as_a_platoon_stays_together() {
    let mut config = base_config();
    config.vehicles = 2;
    config.penetration = 1.0;
    config.start_as_platoon = true;
    config.depart_all_lanes = false;
    config.arrival_position = Some(4_500.0);

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.vehicles_arrived, 2);
    assert_eq!(summary.collisions_recorded, 0);
}

#[test]
fn distributed_speed_position_policy_forms_at_least_one_join() {
    let mut config = base_config();
    config.vehicles = 40;
    config.penetration = 1.0;
    config.road_length = 8_000.0;
    config.lanes = 1;
    config.time_limit = 600.0;
    config.formation_strategy = FormationStrategy::Distributed;
    config.formation_algorithm = "SpeedPosition".to_string();
    config.execution_interval = 5.0;
    config.communication_range = 2_000.0;

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();

    assert!(!summary.cancelled);
    assert_eq!(summary.collisions_recorded, 0);
}

#[test]
fn centralized_greedy_policy_runs_without_collisions() {
    let mut config = base_config();
    config.vehicles = 20;
    config.penetration = 1.0;
    config.formation_strategy = FormationStrategy::Centralized;
    config.formation_centralized_kind = FormationCentralizedKind::Greedy;
    config.execution_interval = 10.0;

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.collisions_recorded, 0);
    assert!(!summary.cancelled);
}

#[test]
fn invalid_config_is_rejected_before_the_run_ever_starts() {
    let mut config = base_config();
    config.lanes = 0;

    let result = Simulation::new(config);
    assert!(matches!(result, Err(ConfigError::ZeroLanes)));
}

#[test]
fn warn_policy_lets_a_tight_single_lane_run_finish_without_aborting() {
    let mut config = base_config();
    config.vehicles = 30;
    config.penetration = 0.0;
    config.lanes = 1;
    config.depart_all_lanes = false;
    config.collisions = CollisionPolicy::Warn;
    config.arrival_position = Some(4_500.0);

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();
    assert!(!summary.cancelled);
}

#[test]
fn depart_method_interval_spreads_arrivals_rather_than_front_loading() {
    let mut config = base_config();
    config.vehicles = 5;
    config.depart_method = DepartMethod::Interval;
    config.depart_interval = 20.0;
    config.penetration = 0.0;
    config.time_limit = 500.0;

    let sim = Simulation::new(config).unwrap();
    let summary = sim.run().unwrap();

    assert!(!summary.cancelled);
    assert_eq!(summary.vehicles_spawned, 5);
}

struct AlwaysTimesOut;

impl platoon_formation_sim_core::formation::optimal::Solver for AlwaysTimesOut {
    fn solve(
        &mut self,
        _problem: &platoon_formation_sim_core::formation::optimal::AssignmentProblem,
        _time_budget: std::time::Duration,
    ) -> Result<Vec<platoon_formation_sim_core::formation::optimal::Assignment>, platoon_formation_sim_core::error::SolverError> {
        Err(platoon_formation_sim_core::error::SolverError::SolverFailed("benchmark solver stub always times out".to_string()))
    }
}

#[test]
fn centralized_optimal_solver_timeout_falls_back_to_greedy_and_keeps_running() {
    use platoon_formation_sim_core::formation::optimal::Optimal;
    use std::time::Duration;

    let mut config = base_config();
    config.vehicles = 10;
    config.penetration = 1.0;
    config.formation_strategy = FormationStrategy::Centralized;
    config.formation_centralized_kind = FormationCentralizedKind::Optimal;
    config.execution_interval = 10.0;
    config.solver_time_budget = 0.001;

    let algorithm = Box::new(Optimal::new(AlwaysTimesOut, Duration::from_micros(1)));
    let sim = Simulation::with_formation_algorithm(config, algorithm).unwrap();
    let summary = sim.run().unwrap();

    assert!(summary.solver_timeouts > 0);
    assert!(!summary.cancelled);
}
