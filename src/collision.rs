//! Collision detector (spec §4.4).
//!
//! Per lane, sort by position descending; report a collision for any
//! consecutive pair where the front vehicle's rear bumper is behind the back
//! vehicle's nose. Generalizes the teacher's single-cell occupancy map
//! (`src/simulation/session.rs`: `current_position: HashMap<CellID,
//! VehicleID>`) to a continuous bounding-box overlap check.

use crate::error::InvariantError;
use crate::fleet::Fleet;
use crate::vehicle_type::VehicleTypeRegistry;

/// One detected overlap: `back` vehicle's nose is past `front` vehicle's
/// rear bumper.
#[derive(Debug, Clone, Copy)]
pub struct Collision {
    pub lane: u32,
    pub front_row: usize,
    pub back_row: usize,
}

/// Scans every lane for consecutive-pair overlaps.
pub fn detect(fleet: &Fleet, registry: &VehicleTypeRegistry, lanes: u32) -> Vec<Collision> {
    let mut collisions = Vec::new();
    for lane in 0..lanes {
        let order = fleet.lane_order_desc(lane);
        for pair in order.windows(2) {
            let (front, back) = (pair[0], pair[1]);
            let front_len = registry.params(fleet.vehicle_type[front]).length;
            if fleet.position[front] - front_len < fleet.position[back] {
                collisions.push(Collision {
                    lane,
                    front_row: front,
                    back_row: back,
                });
            }
        }
    }
    collisions
}

/// Converts a detected collision into the fatal invariant form used by the
/// `Abort` policy (spec §7, exit code 2).
pub fn to_invariant_error(fleet: &Fleet, collision: &Collision) -> InvariantError {
    InvariantError::Overlap {
        lane: collision.lane,
        front: fleet.ids[collision.front_row],
        back: fleet.ids[collision.back_row],
    }
}

/// Minimal backward separation for the `Teleport` policy (spec §9 Open
/// Question (c)): push the rear vehicle back just far enough to clear the
/// overlap and zero its speed.
pub fn separate_minimally(fleet: &mut Fleet, registry: &VehicleTypeRegistry, collision: &Collision) {
    let front_len = registry.params(fleet.vehicle_type[collision.front_row]).length;
    let clear_position = fleet.position[collision.front_row] - front_len;
    fleet.position[collision.back_row] = clear_position.min(fleet.position[collision.back_row]);
    fleet.speed[collision.back_row] = 0.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{ManeuverState, PlatoonRole, VehicleRow};
    use crate::vehicle_type::VehicleTypeId;

    fn row(id: u64, position: f64, lane: u32) -> VehicleRow {
        VehicleRow {
            id,
            vehicle_type: VehicleTypeId::Human,
            color: 0,
            position,
            lane,
            speed: 10.0,
            desired_speed: 30.0,
            cf_target_speed: 30.0,
            depart_time: 0.0,
            depart_position: position,
            depart_lane: lane,
            arrival_position: 10_000.0,
            depart_delay: 0.0,
            time_loss: 0.0,
            platoon_role: PlatoonRole::None,
            platoon_id: None,
            position_in_platoon: None,
            maneuver_state: ManeuverState::Idle,
            maneuver_target_platoon: None,
            maneuver_target_position: None,
            pre_filled: false,
        }
    }

    #[test]
    fn no_collision_when_well_spaced() {
        let mut fleet = Fleet::new();
        fleet.insert(row(1, 0.0, 0));
        fleet.insert(row(2, 20.0, 0));
        let registry = VehicleTypeRegistry::default();
        assert!(detect(&fleet, &registry, 1).is_empty());
    }

    #[test]
    fn detects_overlap() {
        let mut fleet = Fleet::new();
        fleet.insert(row(1, 0.0, 0));
        fleet.insert(row(2, 2.0, 0)); // vehicle length is 4.0, so this overlaps
        let registry = VehicleTypeRegistry::default();
        let collisions = detect(&fleet, &registry, 1);
        assert_eq!(collisions.len(), 1);
    }

    #[test]
    fn separate_minimally_clears_the_overlap() {
        let mut fleet = Fleet::new();
        fleet.insert(row(1, 0.0, 0));
        fleet.insert(row(2, 2.0, 0));
        let registry = VehicleTypeRegistry::default();
        let collisions = detect(&fleet, &registry, 1);
        separate_minimally(&mut fleet, &registry, &collisions[0]);
        assert!(detect(&fleet, &registry, 1).is_empty());
        assert_eq!(fleet.speed[1], 0.0);
    }
}
