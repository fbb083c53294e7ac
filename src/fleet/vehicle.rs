//! Per-vehicle row shape, mirroring the field groups of the teacher's
//! `Vehicle` (`src/agents/vehicle.rs`): identity, kinematics, trip, platoon
//! role, and maneuver state.

use serde::{Deserialize, Serialize};

use crate::fleet::VehicleId;
use crate::platoon::PlatoonId;
use crate::vehicle_type::VehicleTypeId;

/// A vehicle's role with respect to its platoon (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatoonRole {
    None,
    Leader,
    Follower,
}

/// A vehicle's maneuver state (spec §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverState {
    Idle,
    Joining,
    Leaving,
    BeingJoined,
}

/// Owned snapshot of one vehicle's columns. Used both to build a new row for
/// [`crate::fleet::Fleet::insert`] and as the staging value phases 3/4 read
/// and write (spec §4.1: "writes go into a staging column swapped in
/// atomically at phase end").
#[derive(Debug, Clone)]
pub struct VehicleRow {
    pub id: VehicleId,
    pub vehicle_type: VehicleTypeId,
    pub color: u32,

    pub position: f64,
    pub lane: u32,
    pub speed: f64,
    pub desired_speed: f64,
    pub cf_target_speed: f64,

    pub depart_time: f64,
    pub depart_position: f64,
    pub depart_lane: u32,
    pub arrival_position: f64,
    pub depart_delay: f64,
    pub time_loss: f64,

    pub platoon_role: PlatoonRole,
    pub platoon_id: Option<PlatoonId>,
    pub position_in_platoon: Option<u32>,

    pub maneuver_state: ManeuverState,
    pub maneuver_target_platoon: Option<PlatoonId>,
    pub maneuver_target_position: Option<u32>,

    pub pre_filled: bool,
}
