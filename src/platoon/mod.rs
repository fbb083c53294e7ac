//! Platoon registry: platoons are the source of truth for membership (spec
//! §9 "platoon membership cycles"); vehicles only carry a platoon id looked
//! up here, never an owning pointer.

use indexmap::IndexMap;

use crate::fleet::VehicleId;

/// Unique, non-reusable platoon identifier. The teacher generates trip ids
/// as `len + 1` (`src/simulation/session.rs::add_trip`), which would reuse
/// an id after a platoon dissolves and a new one forms; spec §3 explicitly
/// forbids id reuse for platoons, so this registry keeps a monotonic counter
/// instead.
pub type PlatoonId = u64;

/// An ordered group of CACC-capable vehicles sharing a desired speed, lane,
/// and leader (spec §3).
#[derive(Debug, Clone)]
pub struct Platoon {
    pub id: PlatoonId,
    /// Ordered members, leader at index 0.
    pub members: Vec<VehicleId>,
    pub desired_speed: f64,
    pub lane: u32,
    pub formation_time: f64,
}

impl Platoon {
    /// The front-most member (spec §3 invariant: leader is the front-most
    /// member).
    pub fn leader(&self) -> Option<VehicleId> {
        self.members.first().copied()
    }

    /// The rearmost member, the join target for an approaching vehicle.
    pub fn tail(&self) -> Option<VehicleId> {
        self.members.last().copied()
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Owns every live platoon, keyed by a never-reused [`PlatoonId`].
#[derive(Debug, Default)]
pub struct PlatoonRegistry {
    platoons: IndexMap<PlatoonId, Platoon>,
    next_id: PlatoonId,
}

impl PlatoonRegistry {
    pub fn new() -> Self {
        Self {
            platoons: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Creates a new platoon with a fresh leader and returns its id.
    pub fn create(&mut self, leader: VehicleId, desired_speed: f64, lane: u32, formation_time: f64) -> PlatoonId {
        let id = self.next_id;
        self.next_id += 1;
        self.platoons.insert(
            id,
            Platoon {
                id,
                members: vec![leader],
                desired_speed,
                lane,
                formation_time,
            },
        );
        id
    }

    pub fn get(&self, id: PlatoonId) -> Option<&Platoon> {
        self.platoons.get(&id)
    }

    pub fn get_mut(&mut self, id: PlatoonId) -> Option<&mut Platoon> {
        self.platoons.get_mut(&id)
    }

    pub fn remove(&mut self, id: PlatoonId) -> Option<Platoon> {
        self.platoons.swap_remove(&id)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, PlatoonId, Platoon> {
        self.platoons.iter()
    }

    pub fn len(&self) -> usize {
        self.platoons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platoons.is_empty()
    }

    /// Recomputes `desired_speed` as the mean of member desired speeds, if
    /// `update_desired_speed` is enabled. Per spec §9 Open Question (a), the
    /// caller must only invoke this after a *successful* membership change,
    /// never after an aborted join.
    pub fn recompute_desired_speed(
        &mut self,
        id: PlatoonId,
        member_desired_speeds: impl Iterator<Item = f64>,
        update_desired_speed: bool,
    ) {
        if !update_desired_speed {
            return;
        }
        let speeds: Vec<f64> = member_desired_speeds.collect();
        if speeds.is_empty() {
            return;
        }
        let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
        if let Some(p) = self.platoons.get_mut(&id) {
            p.desired_speed = mean;
        }
    }
}
