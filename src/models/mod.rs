//! Car-following dispatcher: one pure function of a fleet snapshot (spec
//! §4.2). Predecessors are computed once per step by sorting each lane by
//! position (ties broken by id), matching the teacher's per-lane occupancy
//! scan in `src/simulation/session.rs`.

pub mod acc;
pub mod cacc;
pub mod krauss;

use crate::fleet::{Fleet, PlatoonRole};
use crate::rng::SimRng;
use crate::road::Road;
use crate::vehicle_type::{VehicleTypeId, VehicleTypeRegistry};

/// Per-vehicle predecessor info computed once per step (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub struct Predecessor {
    pub row: Option<usize>,
    /// Clear gap to the predecessor's rear bumper, `f64::INFINITY` if none.
    pub gap: f64,
    pub lead_speed: f64,
}

/// Computes, for every row index, the vehicle directly ahead of it in the
/// same lane.
pub fn compute_predecessors(fleet: &Fleet, registry: &VehicleTypeRegistry) -> Vec<Predecessor> {
    let mut preds = vec![
        Predecessor {
            row: None,
            gap: f64::INFINITY,
            lead_speed: 0.0,
        };
        fleet.len()
    ];

    let lanes: std::collections::BTreeSet<u32> = fleet.lane.iter().copied().collect();
    for lane in lanes {
        let order = fleet.lane_order_desc(lane);
        for pair in order.windows(2) {
            let (front, back) = (pair[0], pair[1]);
            let front_len = registry.params(fleet.vehicle_type[front]).length;
            let gap = fleet.position[front] - front_len - fleet.position[back];
            preds[back] = Predecessor {
                row: Some(front),
                gap: gap.max(0.0),
                lead_speed: fleet.speed[front],
            };
        }
    }
    preds
}

/// Computes the next speed for every vehicle, dispatched by capability
/// (spec §4.2). Returns speeds in fleet row order; the caller stages them
/// and commits atomically (spec §4.1 phase 4).
#[allow(clippy::too_many_arguments)]
pub fn step(
    fleet: &Fleet,
    predecessors: &[Predecessor],
    registry: &VehicleTypeRegistry,
    road: &Road,
    acc_headway_time: f64,
    cacc_spacing: f64,
    reduced_air_drag: bool,
    dt: f64,
    rng: &mut SimRng,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(fleet.len());
    for idx in fleet.indices() {
        let params = registry.params(fleet.vehicle_type[idx]);
        let pred = predecessors[idx];
        let speed = fleet.speed[idx];
        let desired = fleet.desired_speed[idx].min(params.max_speed).min(road.max_speed);

        let is_cacc_follower = fleet.vehicle_type[idx] == VehicleTypeId::Cacc
            && fleet.platoon_role[idx] == PlatoonRole::Follower
            && pred.row.is_some()
            && fleet.platoon_id[pred.row.unwrap()] == fleet.platoon_id[idx];

        let new_speed = if is_cacc_follower {
            // A CACC follower drafting behind its leader sees reduced
            // aerodynamic drag, modeled as a modest accel headroom bonus.
            let max_accel = if reduced_air_drag { params.max_accel * 1.1 } else { params.max_accel };
            cacc::next_speed(speed, pred.lead_speed, pred.gap, cacc_spacing, max_accel, dt)
        } else {
            match fleet.vehicle_type[idx] {
                VehicleTypeId::Human => krauss::next_speed(
                    speed,
                    desired,
                    pred.gap,
                    pred.lead_speed,
                    params.max_accel,
                    params.max_decel,
                    params.headway_time,
                    params.speed_imperfection,
                    dt,
                    rng,
                ),
                VehicleTypeId::Acc | VehicleTypeId::Cacc => acc::next_speed(
                    speed,
                    desired,
                    pred.gap,
                    pred.lead_speed,
                    params.max_accel,
                    acc_headway_time,
                    dt,
                ),
            }
        };

        out.push(new_speed.clamp(0.0, params.max_speed.min(road.max_speed)));
    }
    out
}
