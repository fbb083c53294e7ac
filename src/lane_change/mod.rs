//! Lateral lane-change model (spec §4.3).
//!
//! Priority per vehicle: (a) stay if unsafe to move; (b) move right if the
//! right lane is usable and safe; (c) move left if desired speed cannot be
//! met in the current lane and the left lane is safe. Platoon members change
//! lanes simultaneously only if the same decision is safe for every member;
//! otherwise none move, mirroring the teacher's `LaneChangeType` vocabulary
//! (`Undefined`/`ChangeLeft`/`ChangeRight`/`Block`) translated from a
//! cellular per-cell check into a continuous-space gap check.
//!
//! Lane 0 is the rightmost lane (spec §3); "move right" decreases the lane
//! index, "move left" increases it.

use std::collections::HashMap;

use crate::fleet::Fleet;
use crate::platoon::{PlatoonId, PlatoonRegistry};
use crate::vehicle_type::VehicleTypeRegistry;

/// A lane-change decision for one vehicle row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneDelta {
    Stay,
    Right,
    Left,
}

impl LaneDelta {
    fn apply(self, lane: u32, lane_count: u32) -> u32 {
        match self {
            LaneDelta::Stay => lane,
            LaneDelta::Right => lane.saturating_sub(1),
            LaneDelta::Left => (lane + 1).min(lane_count.saturating_sub(1)),
        }
    }
}

/// For a single vehicle, the gap to the vehicle ahead and behind of it on a
/// candidate target lane.
fn target_lane_gaps(fleet: &Fleet, registry: &VehicleTypeRegistry, idx: usize, target_lane: u32) -> (f64, f64, f64) {
    let own_pos = fleet.position[idx];
    let mut ahead_gap = f64::INFINITY;
    let mut behind_gap = f64::INFINITY;
    let mut behind_speed = 0.0_f64;

    let mut best_ahead_pos = f64::INFINITY;
    let mut best_behind_pos = f64::NEG_INFINITY;
    let mut ahead_row = None;
    let mut behind_row = None;

    for other in fleet.indices() {
        if other == idx || fleet.lane[other] != target_lane {
            continue;
        }
        let pos = fleet.position[other];
        if pos >= own_pos && pos < best_ahead_pos {
            best_ahead_pos = pos;
            ahead_row = Some(other);
        }
        if pos < own_pos && pos > best_behind_pos {
            best_behind_pos = pos;
            behind_row = Some(other);
        }
    }

    if let Some(a) = ahead_row {
        let len = registry.params(fleet.vehicle_type[a]).length;
        ahead_gap = (fleet.position[a] - len - own_pos).max(0.0);
    }
    if let Some(b) = behind_row {
        let own_len = registry.params(fleet.vehicle_type[idx]).length;
        behind_gap = (own_pos - own_len - fleet.position[b]).max(0.0);
        behind_speed = fleet.speed[b];
    }

    (ahead_gap, behind_gap, behind_speed)
}

fn is_safe(fleet: &Fleet, registry: &VehicleTypeRegistry, idx: usize, target_lane: u32, t_safe: f64) -> bool {
    let (ahead_gap, behind_gap, behind_speed) = target_lane_gaps(fleet, registry, idx, target_lane);
    let own_speed = fleet.speed[idx];
    ahead_gap > own_speed * t_safe && behind_gap > behind_speed * t_safe
}

fn decide_solo(fleet: &Fleet, registry: &VehicleTypeRegistry, idx: usize, lane_count: u32, t_safe: f64) -> LaneDelta {
    let lane = fleet.lane[idx];
    if lane > 0 && is_safe(fleet, registry, idx, lane - 1, t_safe) {
        return LaneDelta::Right;
    }
    let blocked = fleet.speed[idx] < fleet.desired_speed[idx] - 1e-6;
    if blocked && lane + 1 < lane_count && is_safe(fleet, registry, idx, lane + 1, t_safe) {
        return LaneDelta::Left;
    }
    LaneDelta::Stay
}

/// Computes a lane delta for every vehicle row, on a snapshot (spec §4.1
/// phase 3 reads a pre-phase snapshot; writes are applied atomically by the
/// caller).
pub fn decide(
    fleet: &Fleet,
    registry: &VehicleTypeRegistry,
    platoons: &PlatoonRegistry,
    lane_count: u32,
    t_safe: f64,
) -> Vec<LaneDelta> {
    let mut decisions: Vec<LaneDelta> = fleet
        .indices()
        .map(|idx| decide_solo(fleet, registry, idx, lane_count, t_safe))
        .collect();

    // Platoon-atomic override: group rows by platoon id, require the whole
    // platoon to agree and be safe, else nobody in that platoon moves.
    let mut by_platoon: HashMap<PlatoonId, Vec<usize>> = HashMap::new();
    for idx in fleet.indices() {
        if let Some(pid) = fleet.platoon_id[idx] {
            by_platoon.entry(pid).or_default().push(idx);
        }
    }

    for (pid, members) in by_platoon {
        if members.len() < 2 {
            continue;
        }
        let Some(platoon) = platoons.get(pid) else {
            continue;
        };
        let Some(leader_id) = platoon.leader() else {
            continue;
        };
        let Some(leader_idx) = members.iter().copied().find(|&i| fleet.ids[i] == leader_id) else {
            continue;
        };
        let leader_decision = decisions[leader_idx];
        let all_safe = leader_decision == LaneDelta::Stay
            || members.iter().all(|&i| {
                let target = leader_decision.apply(fleet.lane[i], lane_count);
                target != fleet.lane[i] && is_safe(fleet, registry, i, target, t_safe)
            });

        for &i in &members {
            decisions[i] = if all_safe { leader_decision } else { LaneDelta::Stay };
        }
    }

    decisions
}

/// Applies a previously computed decision to a lane index.
pub fn apply(lane: u32, delta: LaneDelta, lane_count: u32) -> u32 {
    delta.apply(lane, lane_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{ManeuverState, PlatoonRole, VehicleRow};
    use crate::vehicle_type::VehicleTypeId;

    fn row(id: u64, position: f64, lane: u32, speed: f64, desired: f64) -> VehicleRow {
        VehicleRow {
            id,
            vehicle_type: VehicleTypeId::Human,
            color: 0,
            position,
            lane,
            speed,
            desired_speed: desired,
            cf_target_speed: desired,
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
    fn moves_right_when_empty_and_safe() {
        let mut fleet = Fleet::new();
        fleet.insert(row(1, 100.0, 1, 20.0, 30.0));
        let registry = VehicleTypeRegistry::default();
        let platoons = PlatoonRegistry::new();
        let decisions = decide(&fleet, &registry, &platoons, 2, 1.0);
        assert_eq!(decisions[0], LaneDelta::Right);
    }

    #[test]
    fn stays_when_right_lane_is_blocked() {
        let mut fleet = Fleet::new();
        fleet.insert(row(1, 100.0, 1, 20.0, 30.0));
        fleet.insert(row(2, 101.0, 0, 20.0, 30.0));
        let registry = VehicleTypeRegistry::default();
        let platoons = PlatoonRegistry::new();
        let decisions = decide(&fleet, &registry, &platoons, 2, 2.0);
        assert_eq!(decisions[0], LaneDelta::Stay);
    }

    #[test]
    fn apply_clamps_to_lane_bounds() {
        assert_eq!(apply(0, LaneDelta::Right, 3), 0);
        assert_eq!(apply(2, LaneDelta::Left, 3), 2);
    }
}
