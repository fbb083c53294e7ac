//! Fleet state: a columnar table of live vehicles plus a dense id→row index.
//!
//! The teacher library stores vehicles as an [`indexmap::IndexMap`] of owning
//! rows (`src/agents/vehicles_storage.rs`). Spec §9 calls for re-architecting
//! that as columnar arrays so phases 3–4 of the simulation loop (lane-change,
//! car-following) can be expressed as batch operations over columns instead
//! of per-object method calls, and so platoon/predecessor links are plain
//! indices rather than owning pointers. This module keeps the teacher's
//! `IndexMap`-based id lookup for the one thing it's still needed for: O(1)
//! translation from a stable [`VehicleId`] to the current row index, which
//! shifts on removal.

mod vehicle;

pub use vehicle::{ManeuverState, PlatoonRole, VehicleRow};

use indexmap::IndexMap;

use crate::platoon::PlatoonId;
use crate::vehicle_type::VehicleTypeId;

/// Unique, non-reusable vehicle identifier (spec §3).
pub type VehicleId = u64;

/// Columnar storage for every live vehicle. All `Vec`s are always the same
/// length; index `i` across every column describes one vehicle.
#[derive(Debug, Default)]
pub struct Fleet {
    id_index: IndexMap<VehicleId, usize>,

    pub ids: Vec<VehicleId>,
    pub vehicle_type: Vec<VehicleTypeId>,
    pub color: Vec<u32>,

    pub position: Vec<f64>,
    pub lane: Vec<u32>,
    pub speed: Vec<f64>,
    pub desired_speed: Vec<f64>,
    pub cf_target_speed: Vec<f64>,

    pub depart_time: Vec<f64>,
    pub depart_position: Vec<f64>,
    pub depart_lane: Vec<u32>,
    pub arrival_position: Vec<f64>,
    pub depart_delay: Vec<f64>,
    pub time_loss: Vec<f64>,

    pub platoon_role: Vec<PlatoonRole>,
    pub platoon_id: Vec<Option<PlatoonId>>,
    pub position_in_platoon: Vec<Option<u32>>,

    pub maneuver_state: Vec<ManeuverState>,
    pub maneuver_target_platoon: Vec<Option<PlatoonId>>,
    pub maneuver_target_position: Vec<Option<u32>>,

    pub pre_filled: Vec<bool>,
    next_id: VehicleId,
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Number of live vehicles.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Allocates a fresh, never-reused [`VehicleId`].
    pub fn next_vehicle_id(&mut self) -> VehicleId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Appends a new vehicle row, built from a [`VehicleRow`] value.
    pub fn insert(&mut self, row: VehicleRow) {
        let idx = self.ids.len();
        self.id_index.insert(row.id, idx);

        self.ids.push(row.id);
        self.vehicle_type.push(row.vehicle_type);
        self.color.push(row.color);
        self.position.push(row.position);
        self.lane.push(row.lane);
        self.speed.push(row.speed);
        self.desired_speed.push(row.desired_speed);
        self.cf_target_speed.push(row.cf_target_speed);
        self.depart_time.push(row.depart_time);
        self.depart_position.push(row.depart_position);
        self.depart_lane.push(row.depart_lane);
        self.arrival_position.push(row.arrival_position);
        self.depart_delay.push(row.depart_delay);
        self.time_loss.push(row.time_loss);
        self.platoon_role.push(row.platoon_role);
        self.platoon_id.push(row.platoon_id);
        self.position_in_platoon.push(row.position_in_platoon);
        self.maneuver_state.push(row.maneuver_state);
        self.maneuver_target_platoon.push(row.maneuver_target_platoon);
        self.maneuver_target_position.push(row.maneuver_target_position);
        self.pre_filled.push(row.pre_filled);
    }

    /// Row index for a vehicle id, if it is still live.
    pub fn row_of(&self, id: VehicleId) -> Option<usize> {
        self.id_index.get(&id).copied()
    }

    /// Snapshot of one vehicle's columns, by id.
    pub fn get(&self, id: VehicleId) -> Option<VehicleRow> {
        let idx = self.row_of(id)?;
        Some(self.row_at(idx))
    }

    /// Snapshot of one vehicle's columns, by row index.
    pub fn row_at(&self, idx: usize) -> VehicleRow {
        VehicleRow {
            id: self.ids[idx],
            vehicle_type: self.vehicle_type[idx],
            color: self.color[idx],
            position: self.position[idx],
            lane: self.lane[idx],
            speed: self.speed[idx],
            desired_speed: self.desired_speed[idx],
            cf_target_speed: self.cf_target_speed[idx],
            depart_time: self.depart_time[idx],
            depart_position: self.depart_position[idx],
            depart_lane: self.depart_lane[idx],
            arrival_position: self.arrival_position[idx],
            depart_delay: self.depart_delay[idx],
            time_loss: self.time_loss[idx],
            platoon_role: self.platoon_role[idx],
            platoon_id: self.platoon_id[idx],
            position_in_platoon: self.position_in_platoon[idx],
            maneuver_state: self.maneuver_state[idx],
            maneuver_target_platoon: self.maneuver_target_platoon[idx],
            maneuver_target_position: self.maneuver_target_position[idx],
            pre_filled: self.pre_filled[idx],
        }
    }

    /// Writes a full row back by index (used to commit staged phase 3/4
    /// writes, spec §4.1).
    pub fn set_row(&mut self, idx: usize, row: &VehicleRow) {
        self.vehicle_type[idx] = row.vehicle_type;
        self.color[idx] = row.color;
        self.position[idx] = row.position;
        self.lane[idx] = row.lane;
        self.speed[idx] = row.speed;
        self.desired_speed[idx] = row.desired_speed;
        self.cf_target_speed[idx] = row.cf_target_speed;
        self.depart_time[idx] = row.depart_time;
        self.depart_position[idx] = row.depart_position;
        self.depart_lane[idx] = row.depart_lane;
        self.arrival_position[idx] = row.arrival_position;
        self.depart_delay[idx] = row.depart_delay;
        self.time_loss[idx] = row.time_loss;
        self.platoon_role[idx] = row.platoon_role;
        self.platoon_id[idx] = row.platoon_id;
        self.position_in_platoon[idx] = row.position_in_platoon;
        self.maneuver_state[idx] = row.maneuver_state;
        self.maneuver_target_platoon[idx] = row.maneuver_target_platoon;
        self.maneuver_target_position[idx] = row.maneuver_target_position;
        self.pre_filled[idx] = row.pre_filled;
    }

    /// Removes a vehicle by id (trip completion, spec §4.1 phase 7).
    /// Uses swap-remove, so the id→index map is repaired for the row that
    /// used to be last.
    pub fn remove(&mut self, id: VehicleId) -> Option<VehicleRow> {
        let idx = self.id_index.swap_remove(&id)?;
        let row = self.row_at(idx);
        let last = self.ids.len() - 1;

        self.ids.swap_remove(idx);
        self.vehicle_type.swap_remove(idx);
        self.color.swap_remove(idx);
        self.position.swap_remove(idx);
        self.lane.swap_remove(idx);
        self.speed.swap_remove(idx);
        self.desired_speed.swap_remove(idx);
        self.cf_target_speed.swap_remove(idx);
        self.depart_time.swap_remove(idx);
        self.depart_position.swap_remove(idx);
        self.depart_lane.swap_remove(idx);
        self.arrival_position.swap_remove(idx);
        self.depart_delay.swap_remove(idx);
        self.time_loss.swap_remove(idx);
        self.platoon_role.swap_remove(idx);
        self.platoon_id.swap_remove(idx);
        self.position_in_platoon.swap_remove(idx);
        self.maneuver_state.swap_remove(idx);
        self.maneuver_target_platoon.swap_remove(idx);
        self.maneuver_target_position.swap_remove(idx);
        self.pre_filled.swap_remove(idx);

        if idx != last {
            let moved_id = self.ids[idx];
            self.id_index.insert(moved_id, idx);
        }
        Some(row)
    }

    /// Row indices of every vehicle on `lane`, sorted by position descending
    /// (front of the lane first), ties broken by id ascending — the
    /// predecessor-computation order spec §4.2 requires.
    pub fn lane_order_desc(&self, lane: u32) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.ids.len()).filter(|&i| self.lane[i] == lane).collect();
        idxs.sort_by(|&a, &b| {
            self.position[b]
                .partial_cmp(&self.position[a])
                .unwrap()
                .then_with(|| self.ids[a].cmp(&self.ids[b]))
        });
        idxs
    }

    /// Iterator over all row indices.
    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.ids.len()
    }
}
