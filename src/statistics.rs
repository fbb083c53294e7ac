//! Statistics accumulator (spec §4.8).
//!
//! Computed here, written by an external sink: every record type is
//! `serde::Serialize` with field order matching the CSV schemas of §6
//! one-for-one, so a caller-side writer is a mechanical `serde`/`csv` pass.
//! Generalizes the teacher's per-step snapshot shape
//! (`src/simulation/states.rs`: `AutomataState`/`VehicleState`) into the six
//! record kinds named here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fleet::{Fleet, PlatoonRole, VehicleId};
use crate::platoon::{PlatoonId, PlatoonRegistry};
use crate::vehicle_type::EmissionClass;

/// `vehicle_trips` row (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTripRecord {
    pub id: VehicleId,
    pub depart_time: f64,
    pub arrival_time: f64,
    pub depart_pos: f64,
    pub arrival_pos: f64,
    pub route_length: f64,
    pub time_loss: f64,
    pub depart_delay: f64,
}

/// `vehicle_traces` row (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTraceRecord {
    pub time: f64,
    pub id: VehicleId,
    pub position: f64,
    pub lane: u32,
    pub speed: f64,
    pub desired_speed: f64,
    pub platoon_id: Option<PlatoonId>,
    pub platoon_role: PlatoonRole,
    pub color: u32,
}

/// `vehicle_changes` row (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleChangeRecord {
    pub time: f64,
    pub id: VehicleId,
    pub from_lane: u32,
    pub to_lane: u32,
    pub reason: String,
}

/// `vehicle_emissions` row (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub time: f64,
    pub id: VehicleId,
    pub co2: f64,
    pub co: f64,
    pub hc: f64,
    pub nox: f64,
    pub pmx: f64,
    pub fuel: f64,
}

/// `platoon_trace` row (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatoonTraceRecord {
    pub time: f64,
    pub platoon_id: PlatoonId,
    pub leader_id: VehicleId,
    pub size: usize,
    pub desired_speed: f64,
    pub lane: u32,
    pub position: f64,
}

/// End-of-run aggregate counters (spec §4.8, §7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub steps_run: u64,
    pub final_time: f64,
    pub vehicles_spawned: u64,
    pub vehicles_arrived: u64,
    pub vehicles_dropped_at_spawn: u64,
    pub collisions_recorded: u64,
    pub joins_committed: u64,
    pub joins_aborted: u64,
    pub leaves_processed: u64,
    pub solver_timeouts: u64,
    pub total_time_loss: f64,
    pub cancelled: bool,
}

impl PlatoonRole {
    fn emission_bias(self) -> f64 {
        // CACC followers draft tighter, modeled as a small aerodynamic
        // discount on every emitted quantity.
        match self {
            PlatoonRole::Follower => 0.9,
            _ => 1.0,
        }
    }
}

/// HBEFA-style polynomial emission model (spec §4.8): instantaneous rate as
/// a function of speed and acceleration, integrated by rectangle rule.
/// Coefficients are illustrative, matched in shape (constant + linear speed
/// + quadratic speed + acceleration cross term) to the published HBEFA
/// functional form, not to a specific certified dataset.
fn emission_rates(class: EmissionClass, speed: f64, accel: f64) -> (f64, f64, f64, f64, f64, f64) {
    let (k_co2, k_co, k_hc, k_nox, k_pmx, k_fuel) = match class {
        EmissionClass::PcEuro6Petrol => (2400.0, 12.0, 0.6, 0.4, 0.01, 0.09),
        EmissionClass::PcEuro6Diesel => (2100.0, 0.5, 0.1, 1.1, 0.02, 0.08),
    };
    let positive_accel = accel.max(0.0);
    let scale = 1.0 + 0.02 * speed + 0.35 * positive_accel;
    (
        k_co2 * scale,
        k_co * scale,
        k_hc * scale,
        k_nox * scale,
        k_pmx * scale,
        k_fuel * scale,
    )
}

/// Accumulates every statistic named in spec §4.8 across a run.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    summary: RunSummary,
    pub trips: Vec<VehicleTripRecord>,
    pub traces: Vec<VehicleTraceRecord>,
    pub changes: Vec<VehicleChangeRecord>,
    pub emissions: Vec<EmissionRecord>,
    pub platoon_traces: Vec<PlatoonTraceRecord>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawn(&mut self, count: u64) {
        self.summary.vehicles_spawned += count;
    }

    pub fn record_spawn_dropped(&mut self, count: u64) {
        self.summary.vehicles_dropped_at_spawn += count;
    }

    pub fn record_collision(&mut self) {
        self.summary.collisions_recorded += 1;
    }

    pub fn record_join_committed(&mut self) {
        self.summary.joins_committed += 1;
    }

    pub fn record_join_aborted(&mut self) {
        self.summary.joins_aborted += 1;
    }

    pub fn record_leave(&mut self) {
        self.summary.leaves_processed += 1;
    }

    pub fn record_solver_timeout(&mut self) {
        self.summary.solver_timeouts += 1;
    }

    pub fn record_lane_change(&mut self, time: f64, id: VehicleId, from_lane: u32, to_lane: u32, reason: &str) {
        self.changes.push(VehicleChangeRecord {
            time,
            id,
            from_lane,
            to_lane,
            reason: reason.to_string(),
        });
    }

    pub fn record_trip_completion(&mut self, record: VehicleTripRecord) {
        self.summary.vehicles_arrived += 1;
        self.summary.total_time_loss += record.time_loss;
        self.trips.push(record);
    }

    /// Takes a per-vehicle trace snapshot and computes its emission sample
    /// for the step (spec §4.8: "computed in the core").
    pub fn record_step_snapshot(
        &mut self,
        time: f64,
        fleet: &Fleet,
        registry: &crate::vehicle_type::VehicleTypeRegistry,
        previous_speeds: &[f64],
        dt: f64,
    ) {
        for idx in fleet.indices() {
            self.traces.push(VehicleTraceRecord {
                time,
                id: fleet.ids[idx],
                position: fleet.position[idx],
                lane: fleet.lane[idx],
                speed: fleet.speed[idx],
                desired_speed: fleet.desired_speed[idx],
                platoon_id: fleet.platoon_id[idx],
                platoon_role: fleet.platoon_role[idx],
                color: fleet.color[idx],
            });

            let accel = (fleet.speed[idx] - previous_speeds.get(idx).copied().unwrap_or(fleet.speed[idx])) / dt;
            let class = registry.params(fleet.vehicle_type[idx]).emission_class;
            let (co2, co, hc, nox, pmx, fuel) = emission_rates(class, fleet.speed[idx], accel);
            let bias = fleet.platoon_role[idx].emission_bias();
            self.emissions.push(EmissionRecord {
                time,
                id: fleet.ids[idx],
                co2: co2 * bias * dt,
                co: co * bias * dt,
                hc: hc * bias * dt,
                nox: nox * bias * dt,
                pmx: pmx * bias * dt,
                fuel: fuel * bias * dt,
            });
        }
    }

    pub fn record_platoon_snapshot(&mut self, time: f64, fleet: &Fleet, platoons: &PlatoonRegistry) {
        for (&id, platoon) in platoons.iter() {
            let Some(leader) = platoon.leader() else { continue };
            let Some(leader_idx) = fleet.row_of(leader) else { continue };
            self.platoon_traces.push(PlatoonTraceRecord {
                time,
                platoon_id: id,
                leader_id: leader,
                size: platoon.size(),
                desired_speed: platoon.desired_speed,
                lane: platoon.lane,
                position: fleet.position[leader_idx],
            });
        }
    }

    pub fn finish(mut self, run_id: Uuid, steps_run: u64, final_time: f64, cancelled: bool) -> RunSummary {
        self.summary.run_id = run_id;
        self.summary.steps_run = steps_run;
        self.summary.final_time = final_time;
        self.summary.cancelled = cancelled;
        self.summary
    }
}
