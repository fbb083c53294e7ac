//! Vehicle spawner (spec §4.5).
//!
//! Three depart methods (`number`, `interval`, `flow`) plus pre-fill. Mirrors
//! the teacher's `Trip`/`TripBuilder` shape (`src/trips/trip.rs`) and the
//! occupancy-before-insert check of `src/simulation/session.rs::generate_vehicle`,
//! generalized from a cellular occupancy lookup to a continuous safety-gap
//! check.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::config::{Config, DepartMethod};
use crate::fleet::{Fleet, ManeuverState, PlatoonRole, VehicleId, VehicleRow};
use crate::road::Road;
use crate::rng::SimRng;
use crate::vehicle_type::{VehicleTypeId, VehicleTypeRegistry};

/// A vehicle that failed its safety-gap check and is waiting to retry.
struct PendingSpawn {
    vehicle_type: VehicleTypeId,
    desired_speed: f64,
    lane: u32,
    position: f64,
    speed: f64,
    retries_left: u32,
}

/// Result of one spawner step, consumed by the statistics accumulator.
#[derive(Debug, Default)]
pub struct SpawnOutcome {
    pub spawned: Vec<VehicleId>,
    /// Vehicles that exhausted `spawn_retry_limit` and were dropped.
    pub dropped: u32,
}

/// Stateful insertion policy. One instance per run, owned by the simulation
/// loop alongside the fleet and the RNG.
pub struct Spawner {
    vehicles_remaining: u32,
    interval_elapsed: f64,
    pending: Vec<PendingSpawn>,
}

impl Spawner {
    pub fn new(config: &Config) -> Self {
        Self {
            vehicles_remaining: config.vehicles,
            interval_elapsed: config.depart_interval,
            pending: Vec::new(),
        }
    }

    /// True once the spawner can never produce another vehicle (used by the
    /// loop's termination condition, spec §4.1: "fleet empty and spawner
    /// exhausted").
    pub fn exhausted(&self, config: &Config) -> bool {
        self.pending.is_empty()
            && match config.depart_method {
                DepartMethod::Number => self.vehicles_remaining == 0,
                DepartMethod::Interval => self.vehicles_remaining == 0,
                DepartMethod::Flow => false,
            }
    }

    fn choose_vehicle_type(config: &Config, rng: &mut SimRng) -> VehicleTypeId {
        if rng.inner_mut().r#gen::<f64>() >= config.penetration {
            VehicleTypeId::Human
        } else if rng.inner_mut().gen_bool(0.5) {
            VehicleTypeId::Acc
        } else {
            VehicleTypeId::Cacc
        }
    }

    fn sample_desired_speed(config: &Config, rng: &mut SimRng) -> f64 {
        if config.random_desired_speed {
            rng.inner_mut().gen_range(config.min_desired_speed..=config.max_desired_speed)
        } else {
            let base = (config.min_desired_speed + config.max_desired_speed) / 2.0;
            let jitter = rng.inner_mut().gen_range(-config.speed_variation..=config.speed_variation);
            base * (1.0 + jitter)
        }
    }

    fn choose_lane(config: &Config, road: &Road, rng: &mut SimRng) -> u32 {
        if config.depart_all_lanes {
            rng.inner_mut().gen_range(0..road.lanes)
        } else {
            0
        }
    }

    fn choose_depart_position(config: &Config, road: &Road, rng: &mut SimRng) -> f64 {
        if config.random_depart_position {
            rng.inner_mut().gen_range(0.0..road.length)
        } else {
            road.first_ramp_at_or_after(0.0).unwrap_or(0.0)
        }
    }

    /// Whether inserting a vehicle of `length` at `(position, lane)` moving
    /// at `speed` would honor the minimum safety gap to its neighbors.
    fn has_safe_gap(fleet: &Fleet, registry: &VehicleTypeRegistry, lane: u32, position: f64, length: f64) -> bool {
        for idx in fleet.indices() {
            if fleet.lane[idx] != lane {
                continue;
            }
            let other_len = registry.params(fleet.vehicle_type[idx]).length;
            let other_pos = fleet.position[idx];
            if other_pos >= position {
                if other_pos - other_len < position {
                    return false;
                }
            } else if position - length < other_pos {
                return false;
            }
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn try_insert(
        &mut self,
        fleet: &mut Fleet,
        registry: &VehicleTypeRegistry,
        config: &Config,
        road: &Road,
        vehicle_type: VehicleTypeId,
        desired_speed: f64,
        lane: u32,
        position: f64,
        speed: f64,
        t: f64,
    ) -> Option<VehicleId> {
        let length = registry.params(vehicle_type).length;
        if !Self::has_safe_gap(fleet, registry, lane, position, length) {
            return None;
        }
        let id = fleet.next_vehicle_id();
        let arrival_position = config.arrival_position.unwrap_or(road.length);
        fleet.insert(VehicleRow {
            id,
            vehicle_type,
            color: 0,
            position,
            lane,
            speed,
            desired_speed,
            cf_target_speed: desired_speed,
            depart_time: t,
            depart_position: position,
            depart_lane: lane,
            arrival_position,
            depart_delay: 0.0,
            time_loss: 0.0,
            platoon_role: PlatoonRole::None,
            platoon_id: None,
            position_in_platoon: None,
            maneuver_state: ManeuverState::Idle,
            maneuver_target_platoon: None,
            maneuver_target_position: None,
            pre_filled: false,
        });
        Some(id)
    }

    /// Runs one step of the spawn phase (spec §4.1 phase 1).
    pub fn step(
        &mut self,
        t: f64,
        step_length: f64,
        config: &Config,
        road: &Road,
        registry: &VehicleTypeRegistry,
        fleet: &mut Fleet,
        rng: &mut SimRng,
    ) -> SpawnOutcome {
        let mut outcome = SpawnOutcome::default();

        // Retry queue first, oldest first, so long-waiting vehicles are not
        // starved by freshly generated ones.
        let mut still_pending = Vec::new();
        let pending = std::mem::take(&mut self.pending);
        for mut candidate in pending {
            match self.try_insert(
                fleet,
                registry,
                config,
                road,
                candidate.vehicle_type,
                candidate.desired_speed,
                candidate.lane,
                candidate.position,
                candidate.speed,
                t,
            ) {
                Some(id) => outcome.spawned.push(id),
                None => {
                    candidate.retries_left = candidate.retries_left.saturating_sub(1);
                    if candidate.retries_left == 0 {
                        outcome.dropped += 1;
                    } else {
                        still_pending.push(candidate);
                    }
                }
            }
        }
        self.pending = still_pending;

        let mut new_arrivals: u32 = match config.depart_method {
            DepartMethod::Number => {
                if self.vehicles_remaining > 0 {
                    self.vehicles_remaining -= 1;
                    1
                } else {
                    0
                }
            }
            DepartMethod::Interval => {
                self.interval_elapsed += step_length;
                if self.interval_elapsed >= config.depart_interval && self.vehicles_remaining > 0 {
                    self.interval_elapsed = 0.0;
                    self.vehicles_remaining -= 1;
                    1
                } else {
                    0
                }
            }
            DepartMethod::Flow => {
                let expected = config.depart_flow / 3600.0 * step_length;
                if expected <= 0.0 {
                    0
                } else {
                    let dist = Poisson::new(expected).expect("flow rate must be positive and finite");
                    dist.sample(rng.inner_mut()) as u32
                }
            }
        };

        while new_arrivals > 0 {
            new_arrivals -= 1;
            let vehicle_type = Self::choose_vehicle_type(config, rng);
            let desired_speed = Self::sample_desired_speed(config, rng);
            let lane = Self::choose_lane(config, road, rng);
            let position = Self::choose_depart_position(config, road, rng);
            let speed = if config.depart_desired { desired_speed } else { 0.0 };

            match self.try_insert(fleet, registry, config, road, vehicle_type, desired_speed, lane, position, speed, t) {
                Some(id) => outcome.spawned.push(id),
                None => self.pending.push(PendingSpawn {
                    vehicle_type,
                    desired_speed,
                    lane,
                    position,
                    speed,
                    retries_left: config.spawn_retry_limit,
                }),
            }
        }

        outcome
    }

    /// Populates the road to target density before `t = 0` (spec §4.5).
    /// Pre-filled vehicles get a random phase offset into the formation
    /// scheduler's period, stored in `depart_delay` since pre-filled vehicles
    /// never actually incur a spawn-side delay.
    pub fn pre_fill(&self, config: &Config, road: &Road, registry: &VehicleTypeRegistry, fleet: &mut Fleet, rng: &mut SimRng) {
        if !config.pre_fill {
            return;
        }
        let road_km = road.length / 1000.0;
        let target_total = (config.density * road_km * road.lanes as f64).round() as u32;

        for _ in 0..target_total {
            let vehicle_type = Self::choose_vehicle_type(config, rng);
            let desired_speed = Self::sample_desired_speed(config, rng);
            let lane = rng.inner_mut().gen_range(0..road.lanes);
            let length = registry.params(vehicle_type).length;

            let mut placed = false;
            for _ in 0..config.spawn_retry_limit.max(1) {
                let position = rng.inner_mut().gen_range(0.0..road.length);
                if Self::has_safe_gap(fleet, registry, lane, position, length) {
                    let id = fleet.next_vehicle_id();
                    let phase_offset = rng.inner_mut().gen_range(0.0..config.execution_interval.max(1.0));
                    fleet.insert(VehicleRow {
                        id,
                        vehicle_type,
                        color: 0,
                        position,
                        lane,
                        speed: desired_speed,
                        desired_speed,
                        cf_target_speed: desired_speed,
                        depart_time: 0.0,
                        depart_position: position,
                        depart_lane: lane,
                        arrival_position: config.arrival_position.unwrap_or(road.length),
                        depart_delay: phase_offset,
                        time_loss: 0.0,
                        platoon_role: PlatoonRole::None,
                        platoon_id: None,
                        position_in_platoon: None,
                        maneuver_state: ManeuverState::Idle,
                        maneuver_target_platoon: None,
                        maneuver_target_position: None,
                        pre_filled: true,
                    });
                    placed = true;
                    break;
                }
            }
            if !placed {
                continue;
            }
        }
    }
}
