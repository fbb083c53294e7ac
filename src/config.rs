//! Simulation configuration.
//!
//! CLI parsing is a caller concern (spec §1); this module only defines the
//! validated data type [`Config`] the simulation loop is driven by, the way
//! the teacher's `TripBuilder` defines the shape of a trip without owning
//! how its fields were sourced. `serde` derives let a caller load a `Config`
//! from TOML/JSON/argv without this crate picking the format.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::formation::registry;

/// How new vehicles are introduced onto the road (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartMethod {
    /// Generate a fixed total number of vehicles, front-loaded.
    Number,
    /// Generate one vehicle every `depart_interval` seconds.
    Interval,
    /// Poisson arrivals at a configured rate.
    Flow,
}

/// Collision-handling policy (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Log the collision and continue.
    Warn,
    /// Separate the rear vehicle minimally and continue.
    Teleport,
    /// Fail the run (spec §7, exit code 2).
    Abort,
}

/// Which formation scheduler dispatches assignment decisions (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormationStrategy {
    Distributed,
    Centralized,
}

/// Which centralized policy runs when `formation_strategy == Centralized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormationCentralizedKind {
    Greedy,
    Optimal,
}

/// Full simulation configuration. Field groups follow spec §6 one-for-one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // --- Road ---
    pub road_length: f64,
    pub lanes: u32,
    pub ramp_interval: f64,

    // --- Vehicles ---
    pub vehicles: u32,
    pub density: f64,
    pub penetration: f64,
    pub min_desired_speed: f64,
    pub max_desired_speed: f64,
    pub speed_variation: f64,
    pub random_desired_speed: bool,

    // --- Trips ---
    pub depart_method: DepartMethod,
    pub depart_interval: f64,
    pub depart_flow: f64,
    pub depart_desired: bool,
    pub random_depart_position: bool,
    pub random_arrival_position: bool,
    pub arrival_position: Option<f64>,
    pub depart_all_lanes: bool,

    // --- Car-following ---
    pub acc_headway_time: f64,
    pub cacc_spacing: f64,
    pub reduced_air_drag: bool,

    // --- Platoon ---
    pub start_as_platoon: bool,
    pub pre_fill: bool,
    pub update_desired_speed: bool,

    // --- Formation ---
    pub formation_algorithm: String,
    pub formation_strategy: FormationStrategy,
    pub formation_centralized_kind: FormationCentralizedKind,
    pub execution_interval: f64,
    pub infrastructures: u32,
    pub communication_range: f64,

    // --- Simulation ---
    pub time_limit: f64,
    pub step_length: f64,
    pub random_seed: u64,
    pub collisions: CollisionPolicy,
    pub lane_changes: bool,
    pub dry_run: bool,

    // --- Misc limits ---
    pub spawn_retry_limit: u32,
    pub teleport_max: f64,
    pub approach_time_max: f64,
    pub solver_time_budget: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            road_length: 5_000.0,
            lanes: 4,
            ramp_interval: 500.0,

            vehicles: 100,
            density: 20.0,
            penetration: 0.5,
            min_desired_speed: 20.0,
            max_desired_speed: 30.0,
            speed_variation: 0.1,
            random_desired_speed: false,

            depart_method: DepartMethod::Number,
            depart_interval: 1.0,
            depart_flow: 1800.0,
            depart_desired: true,
            random_depart_position: false,
            random_arrival_position: false,
            arrival_position: None,
            depart_all_lanes: false,

            acc_headway_time: 1.0,
            cacc_spacing: 5.0,
            reduced_air_drag: false,

            start_as_platoon: false,
            pre_fill: false,
            update_desired_speed: true,

            formation_algorithm: "SpeedPosition".to_string(),
            formation_strategy: FormationStrategy::Distributed,
            formation_centralized_kind: FormationCentralizedKind::Greedy,
            execution_interval: 30.0,
            infrastructures: 0,
            communication_range: 1000.0,

            time_limit: 100.0,
            step_length: 1.0,
            random_seed: 42,
            collisions: CollisionPolicy::Warn,
            lane_changes: true,
            dry_run: false,

            spawn_retry_limit: 5,
            teleport_max: 2_000.0,
            approach_time_max: 60.0,
            solver_time_budget: 1.0,
        }
    }
}

impl Config {
    /// Validates every cross-field constraint named in spec §7's *Config*
    /// error class. Must be called, and must succeed, before `t = 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes == 0 {
            return Err(ConfigError::ZeroLanes);
        }
        if self.ramp_interval <= 0.0 {
            return Err(ConfigError::NonPositiveRampInterval);
        }
        if self.step_length <= 0.0 {
            return Err(ConfigError::NonPositiveStepLength);
        }
        if self.time_limit <= 0.0 {
            return Err(ConfigError::NonPositiveTimeLimit);
        }
        if !(0.0..=1.0).contains(&self.penetration) {
            return Err(ConfigError::PenetrationOutOfRange(self.penetration));
        }
        if self.execution_interval <= 0.0 {
            return Err(ConfigError::NonPositiveExecutionInterval);
        }
        // Capacity check: bumper-to-bumper vehicles at min_gap=4m+2m spacing
        // must physically fit the requested density.
        let min_gap = 6.0_f64;
        let max_density_per_lane = 1000.0 / min_gap; // veh/km/lane
        if self.density > max_density_per_lane {
            return Err(ConfigError::DensityExceedsCapacity {
                density: self.density,
                lanes: self.lanes,
                min_gap,
            });
        }
        if self.formation_strategy == FormationStrategy::Distributed
            && registry::resolve(&self.formation_algorithm).is_none()
        {
            return Err(ConfigError::UnknownFormationAlgorithm(
                self.formation_algorithm.clone(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_lanes_is_rejected() {
        let mut cfg = Config::default();
        cfg.lanes = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroLanes));
    }

    #[test]
    fn penetration_out_of_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.penetration = 1.5;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PenetrationOutOfRange(1.5))
        );
    }

    #[test]
    fn unknown_formation_algorithm_is_rejected() {
        let mut cfg = Config::default();
        cfg.formation_algorithm = "DoesNotExist".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnknownFormationAlgorithm(_))
        ));
    }

    #[test]
    fn excessive_density_is_rejected() {
        let mut cfg = Config::default();
        cfg.density = 10_000.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DensityExceedsCapacity { .. })
        ));
    }
}
