//! Formation scheduler (spec §4.7).
//!
//! The scheduler never touches mobility state directly — it is a plain
//! function of a read-only snapshot that emits commands the maneuver
//! coordinator applies at the next action boundary (spec §9 "scheduler as
//! plain function of a snapshot"). Algorithms are capability
//! implementations resolved by name at build time (§9 "avoid reflection"),
//! the same way the teacher resolves `BehaviourType`/`AgentType` through an
//! exhaustive match table rather than any dynamic lookup.

pub mod greedy;
pub mod optimal;
pub mod registry;
pub mod speed_position;

use crate::fleet::{Fleet, PlatoonRole};
use crate::maneuver::JoinRequest;
use crate::platoon::{PlatoonId, PlatoonRegistry};

/// A snapshot one vehicle contributes to the scheduler's view. Copied out of
/// [`Fleet`] columns so the scheduler never retains a live borrow across a
/// step boundary.
#[derive(Debug, Clone, Copy)]
pub struct VehicleSnapshot {
    pub id: u64,
    pub position: f64,
    pub lane: u32,
    pub speed: f64,
    pub desired_speed: f64,
    pub platoon_role: PlatoonRole,
    pub platoon_id: Option<PlatoonId>,
    pub cacc_capable: bool,
}

/// A snapshot one platoon contributes to the scheduler's view.
#[derive(Debug, Clone, Copy)]
pub struct PlatoonSnapshot {
    pub id: PlatoonId,
    pub leader: u64,
    pub tail: u64,
    pub desired_speed: f64,
    pub lane: u32,
    pub size: usize,
}

/// A read-only, owned snapshot of fleet and platoon state (spec §9). Built
/// once per formation-scheduler invocation.
#[derive(Debug, Clone)]
pub struct FleetView {
    pub vehicles: Vec<VehicleSnapshot>,
    pub platoons: Vec<PlatoonSnapshot>,
    pub communication_range: f64,
}

impl FleetView {
    pub fn capture(fleet: &Fleet, platoons: &PlatoonRegistry, communication_range: f64) -> Self {
        use crate::vehicle_type::VehicleTypeId;

        let vehicles = fleet
            .indices()
            .map(|idx| VehicleSnapshot {
                id: fleet.ids[idx],
                position: fleet.position[idx],
                lane: fleet.lane[idx],
                speed: fleet.speed[idx],
                desired_speed: fleet.desired_speed[idx],
                platoon_role: fleet.platoon_role[idx],
                platoon_id: fleet.platoon_id[idx],
                cacc_capable: fleet.vehicle_type[idx] == VehicleTypeId::Cacc,
            })
            .collect();

        let platoons = platoons
            .iter()
            .filter_map(|(&id, p)| {
                Some(PlatoonSnapshot {
                    id,
                    leader: p.leader()?,
                    tail: p.tail()?,
                    desired_speed: p.desired_speed,
                    lane: p.lane,
                    size: p.size(),
                })
            })
            .collect();

        FleetView {
            vehicles,
            platoons,
            communication_range,
        }
    }
}

/// Simulated time handed to a scheduler invocation.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    pub time: f64,
    pub step_length: f64,
}

/// A command the maneuver coordinator applies after the scheduler runs.
#[derive(Debug, Clone, Copy)]
pub enum FormationCommand {
    Join(JoinRequest),
    Leave { vehicle: u64 },
}

/// A pluggable vehicle-to-platoon assignment policy (spec §4.7, §9).
pub trait FormationAlgorithm {
    fn on_step(&mut self, view: &FleetView, clock: SimClock) -> Vec<FormationCommand>;

    /// Whether the most recent [`Self::on_step`] call fell back from a timed
    /// numeric solver to a cheaper policy (spec §7/§8 "solver timeout
    /// fallback"). Only [`optimal::Optimal`] ever returns `true`.
    fn timed_out_last_step(&self) -> bool {
        false
    }
}
