//! Platoon join/leave maneuver state machines (spec §4.6).
//!
//! Joins are modeled as a bounded approach delay followed by an abstract
//! teleport; leaves are a single step of abstract lateral offset. In-flight
//! join state is tracked here rather than in [`crate::fleet::Fleet`] columns,
//! the same way the teacher's `VehicleIntention`/`TailIntentionManeuver`
//! (`src/agents/vehicle.rs`) carries an intention struct alongside — not
//! inside — the vehicle's core fields, and aborts are recorded with a reason
//! the way `src/conflicts/conflicts_solver.rs` records conflict outcomes.

use indexmap::IndexMap;

use crate::fleet::{Fleet, ManeuverState, PlatoonRole, VehicleId};
use crate::platoon::{PlatoonId, PlatoonRegistry};
use crate::vehicle_type::VehicleTypeRegistry;

/// Why a join attempt gave up (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    PlatoonDisbanded,
    TeleportExceedsMax,
    UnsafeAtDestination,
    TimeBudgetExceeded,
}

/// Outcome of a join attempt, recorded for statistics regardless of result.
#[derive(Debug, Clone, Copy)]
pub enum JoinOutcome {
    Committed,
    Aborted(AbortReason),
}

#[derive(Debug, Clone, Copy)]
pub struct JoinEvent {
    pub vehicle: VehicleId,
    pub platoon: PlatoonId,
    pub outcome: JoinOutcome,
}

#[derive(Debug, Clone)]
pub struct LeaveEvent {
    pub vehicle: VehicleId,
    pub former_platoon: PlatoonId,
    /// Ids of platoons that exist after the leave (0, 1, or 2 for a split).
    pub resulting_platoons: Vec<PlatoonId>,
}

/// An in-flight join: the platoon targeted and the approach time still
/// remaining.
struct JoinProgress {
    platoon: PlatoonId,
    remaining: f64,
}

/// Requested join from the formation scheduler (spec §4.7).
#[derive(Debug, Clone, Copy)]
pub struct JoinRequest {
    pub vehicle: VehicleId,
    pub platoon: PlatoonId,
}

/// Tracks every join in progress across steps. Owned by the simulation loop.
/// `IndexMap` so `advance` iterates in insertion order rather than hash
/// order: its loop body mutates fleet state as it commits each join, so a
/// process-randomized order could change outcomes run to run (spec §4.1,
/// §8 determinism).
#[derive(Default)]
pub struct ManeuverCoordinator {
    joins: IndexMap<VehicleId, JoinProgress>,
}

impl ManeuverCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a join: computes the approach time and either starts the
    /// countdown or aborts immediately (spec §4.6 step 1).
    pub fn start_join(
        &mut self,
        fleet: &mut Fleet,
        platoons: &PlatoonRegistry,
        request: JoinRequest,
        approach_time_max: f64,
    ) -> JoinEvent {
        let Some(idx) = fleet.row_of(request.vehicle) else {
            return JoinEvent {
                vehicle: request.vehicle,
                platoon: request.platoon,
                outcome: JoinOutcome::Aborted(AbortReason::PlatoonDisbanded),
            };
        };
        let Some(platoon) = platoons.get(request.platoon) else {
            return JoinEvent {
                vehicle: request.vehicle,
                platoon: request.platoon,
                outcome: JoinOutcome::Aborted(AbortReason::PlatoonDisbanded),
            };
        };
        let Some(tail_id) = platoon.tail() else {
            return JoinEvent {
                vehicle: request.vehicle,
                platoon: request.platoon,
                outcome: JoinOutcome::Aborted(AbortReason::PlatoonDisbanded),
            };
        };
        let Some(tail_idx) = fleet.row_of(tail_id) else {
            return JoinEvent {
                vehicle: request.vehicle,
                platoon: request.platoon,
                outcome: JoinOutcome::Aborted(AbortReason::PlatoonDisbanded),
            };
        };

        let distance = (fleet.position[idx] - fleet.position[tail_idx]).abs();
        let speed_diff = fleet.desired_speed[idx] - platoon.desired_speed;
        let tau_app = distance / (speed_diff.abs() + 1e-6);

        if tau_app > approach_time_max {
            return JoinEvent {
                vehicle: request.vehicle,
                platoon: request.platoon,
                outcome: JoinOutcome::Aborted(AbortReason::TimeBudgetExceeded),
            };
        }

        self.joins.insert(
            request.vehicle,
            JoinProgress {
                platoon: request.platoon,
                remaining: tau_app,
            },
        );
        fleet.maneuver_state[idx] = ManeuverState::Joining;
        fleet.maneuver_target_platoon[idx] = Some(request.platoon);

        JoinEvent {
            vehicle: request.vehicle,
            platoon: request.platoon,
            outcome: JoinOutcome::Committed, // countdown started; terminal event follows from `advance`
        }
    }

    /// Advances every in-flight join by `dt`; teleports and commits the ones
    /// whose approach delay has elapsed (spec §4.6 steps 2-4).
    pub fn advance(
        &mut self,
        fleet: &mut Fleet,
        platoons: &mut PlatoonRegistry,
        registry: &VehicleTypeRegistry,
        lane_count: u32,
        cacc_spacing: f64,
        teleport_max: f64,
        update_desired_speed: bool,
        dt: f64,
    ) -> Vec<JoinEvent> {
        let mut events = Vec::new();
        let pending: Vec<VehicleId> = self.joins.keys().copied().collect();

        for vehicle in pending {
            let Some(idx) = fleet.row_of(vehicle) else {
                self.joins.swap_remove(&vehicle);
                continue;
            };
            let platoon_id = self.joins.get(&vehicle).unwrap().platoon;
            let Some(platoon) = platoons.get(platoon_id) else {
                self.joins.swap_remove(&vehicle);
                fleet.maneuver_state[idx] = ManeuverState::Idle;
                fleet.maneuver_target_platoon[idx] = None;
                events.push(JoinEvent {
                    vehicle,
                    platoon: platoon_id,
                    outcome: JoinOutcome::Aborted(AbortReason::PlatoonDisbanded),
                });
                continue;
            };

            let progress = self.joins.get_mut(&vehicle).unwrap();
            progress.remaining -= dt;
            if progress.remaining > 0.0 {
                continue;
            }

            let tail_id = platoon.tail().unwrap();
            let tail_idx = fleet.row_of(tail_id).unwrap();
            let length = registry.params(fleet.vehicle_type[idx]).length;
            let teleport_distance = (fleet.position[idx] - fleet.position[tail_idx]).abs();

            self.joins.swap_remove(&vehicle);

            if teleport_distance > teleport_max {
                fleet.maneuver_state[idx] = ManeuverState::Idle;
                fleet.maneuver_target_platoon[idx] = None;
                events.push(JoinEvent {
                    vehicle,
                    platoon: platoon_id,
                    outcome: JoinOutcome::Aborted(AbortReason::TeleportExceedsMax),
                });
                continue;
            }

            let destination = fleet.position[tail_idx] - cacc_spacing - length;
            let destination_lane = platoon.lane;

            if let Some(blocker) = find_blocker(fleet, idx, destination_lane, destination, length) {
                if !make_space(fleet, registry, blocker, destination_lane, lane_count) {
                    fleet.maneuver_state[idx] = ManeuverState::Idle;
                    fleet.maneuver_target_platoon[idx] = None;
                    events.push(JoinEvent {
                        vehicle,
                        platoon: platoon_id,
                        outcome: JoinOutcome::Aborted(AbortReason::UnsafeAtDestination),
                    });
                    continue;
                }
            }

            let platoon_speed = platoon.desired_speed;
            let position_in_platoon = platoon.size() as u32;

            fleet.position[idx] = destination;
            fleet.lane[idx] = destination_lane;
            fleet.speed[idx] = platoon_speed;
            fleet.platoon_role[idx] = PlatoonRole::Follower;
            fleet.platoon_id[idx] = Some(platoon_id);
            fleet.position_in_platoon[idx] = Some(position_in_platoon);
            fleet.maneuver_state[idx] = ManeuverState::Idle;
            fleet.maneuver_target_platoon[idx] = None;

            platoons.get_mut(platoon_id).unwrap().members.push(vehicle);
            recompute_desired_speed(fleet, platoons, platoon_id, update_desired_speed);

            events.push(JoinEvent {
                vehicle,
                platoon: platoon_id,
                outcome: JoinOutcome::Committed,
            });
        }

        events
    }

    /// Drops any in-flight join for `vehicle` without recording an abort
    /// (used when a vehicle completes its trip mid-approach).
    pub fn cancel(&mut self, vehicle: VehicleId) {
        self.joins.swap_remove(&vehicle);
    }
}

/// Row index of a vehicle already occupying `position` (within `length`) on
/// `lane`, if any — the "destination occupied" case of spec §4.6 step 4.
fn find_blocker(fleet: &Fleet, joining_idx: usize, lane: u32, position: f64, length: f64) -> Option<usize> {
    fleet.indices().find(|&idx| {
        idx != joining_idx
            && fleet.lane[idx] == lane
            && (fleet.position[idx] - position).abs() < length
    })
}

/// Displaces `blocker_idx` one lane left, if that lane exists and is clear
/// there (spec §4.6 step 4: "displaced ... by the same rules as 4.3").
fn make_space(fleet: &mut Fleet, registry: &VehicleTypeRegistry, blocker_idx: usize, from_lane: u32, lane_count: u32) -> bool {
    let target_lane = from_lane + 1;
    if target_lane >= lane_count {
        return false;
    }
    let length = registry.params(fleet.vehicle_type[blocker_idx]).length;
    let position = fleet.position[blocker_idx];
    let clear = fleet
        .indices()
        .filter(|&idx| idx != blocker_idx && fleet.lane[idx] == target_lane)
        .all(|idx| (fleet.position[idx] - position).abs() >= length);
    if clear {
        fleet.lane[blocker_idx] = target_lane;
    }
    clear
}

fn recompute_desired_speed(fleet: &Fleet, platoons: &mut PlatoonRegistry, platoon_id: PlatoonId, update_desired_speed: bool) {
    let Some(platoon) = platoons.get(platoon_id) else { return };
    let speeds: Vec<f64> = platoon
        .members
        .iter()
        .filter_map(|&id| fleet.row_of(id))
        .map(|idx| fleet.desired_speed[idx])
        .collect();
    platoons.recompute_desired_speed(platoon_id, speeds.into_iter(), update_desired_speed);
}

/// Marks a vehicle to leave its platoon at the next leave-processing pass
/// (spec §4.6: `follower|leader -> leaving -> idle`).
pub fn request_leave(fleet: &mut Fleet, vehicle: VehicleId) {
    if let Some(idx) = fleet.row_of(vehicle) {
        if fleet.platoon_role[idx] != PlatoonRole::None {
            fleet.maneuver_state[idx] = ManeuverState::Leaving;
        }
    }
}

/// Finalizes every vehicle currently in `Leaving` state (spec §4.6: leader,
/// tail, and middle cases).
pub fn process_leaves(fleet: &mut Fleet, platoons: &mut PlatoonRegistry, update_desired_speed: bool, now: f64) -> Vec<LeaveEvent> {
    let leaving: Vec<usize> = fleet
        .indices()
        .filter(|&idx| fleet.maneuver_state[idx] == ManeuverState::Leaving)
        .collect();

    let mut events = Vec::new();
    for idx in leaving {
        let vehicle = fleet.ids[idx];
        let Some(platoon_id) = fleet.platoon_id[idx] else {
            fleet.maneuver_state[idx] = ManeuverState::Idle;
            continue;
        };
        let Some(platoon) = platoons.get(platoon_id) else {
            fleet.maneuver_state[idx] = ManeuverState::Idle;
            fleet.platoon_role[idx] = PlatoonRole::None;
            fleet.platoon_id[idx] = None;
            continue;
        };

        let members = platoon.members.clone();
        let formation_time = platoon.formation_time;
        let lane = platoon.lane;
        let position_of_leaving = members.iter().position(|&id| id == vehicle).unwrap();

        fleet.maneuver_state[idx] = ManeuverState::Idle;
        fleet.platoon_role[idx] = PlatoonRole::None;
        fleet.platoon_id[idx] = None;
        fleet.position_in_platoon[idx] = None;

        let mut resulting_platoons = Vec::new();

        if position_of_leaving == 0 || position_of_leaving == members.len() - 1 {
            // Leader or tail leaves: the platoon keeps its id (spec §4.6); a
            // leader leave promotes the new front-most member in place.
            let mut remaining = members.clone();
            remaining.remove(position_of_leaving);
            if remaining.len() == 1 {
                platoons.remove(platoon_id);
                if let Some(solo_idx) = fleet.row_of(remaining[0]) {
                    fleet.platoon_role[solo_idx] = PlatoonRole::None;
                    fleet.platoon_id[solo_idx] = None;
                    fleet.position_in_platoon[solo_idx] = None;
                }
            } else {
                for (i, &member) in remaining.iter().enumerate() {
                    if let Some(member_idx) = fleet.row_of(member) {
                        fleet.platoon_role[member_idx] = if i == 0 { PlatoonRole::Leader } else { PlatoonRole::Follower };
                        fleet.position_in_platoon[member_idx] = Some(i as u32);
                    }
                }
                if let Some(p) = platoons.get_mut(platoon_id) {
                    p.members = remaining;
                }
                recompute_desired_speed(fleet, platoons, platoon_id, update_desired_speed);
                resulting_platoons.push(platoon_id);
            }
        } else {
            // Middle leaves: the original platoon dissolves into two fresh ones.
            platoons.remove(platoon_id);
            let (before, after) = members.split_at(position_of_leaving);
            let after = &after[1..];
            resulting_platoons.extend(settle_group(fleet, platoons, before, lane, formation_time, update_desired_speed));
            resulting_platoons.extend(settle_group(fleet, platoons, after, lane, formation_time, update_desired_speed));
        }

        events.push(LeaveEvent {
            vehicle,
            former_platoon: platoon_id,
            resulting_platoons,
        });
    }

    let _ = now; // formation_time of fresh platoons is inherited, not restamped at leave time
    events
}

/// Rebuilds a platoon (or dissolves it to solo) from a contiguous member
/// slice left over after a leave, returning the fresh platoon id if one was
/// created.
fn settle_group(
    fleet: &mut Fleet,
    platoons: &mut PlatoonRegistry,
    group: &[VehicleId],
    lane: u32,
    formation_time: f64,
    update_desired_speed: bool,
) -> Option<PlatoonId> {
    if group.is_empty() {
        return None;
    }
    if group.len() == 1 {
        if let Some(idx) = fleet.row_of(group[0]) {
            fleet.platoon_role[idx] = PlatoonRole::None;
            fleet.platoon_id[idx] = None;
            fleet.position_in_platoon[idx] = None;
        }
        return None;
    }

    let leader = group[0];
    let leader_desired = fleet.row_of(leader).map(|i| fleet.desired_speed[i]).unwrap_or(0.0);
    let new_id = platoons.create(leader, leader_desired, lane, formation_time);

    if let Some(idx) = fleet.row_of(leader) {
        fleet.platoon_role[idx] = PlatoonRole::Leader;
        fleet.platoon_id[idx] = Some(new_id);
        fleet.position_in_platoon[idx] = Some(0);
    }

    for (i, &member) in group.iter().enumerate().skip(1) {
        if let Some(idx) = fleet.row_of(member) {
            fleet.platoon_role[idx] = PlatoonRole::Follower;
            fleet.platoon_id[idx] = Some(new_id);
            fleet.position_in_platoon[idx] = Some(i as u32);
        }
        if let Some(p) = platoons.get_mut(new_id) {
            p.members.push(member);
        }
    }

    recompute_desired_speed(fleet, platoons, new_id, update_desired_speed);
    Some(new_id)
}
