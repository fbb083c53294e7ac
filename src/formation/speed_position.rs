//! Distributed per-vehicle formation policy (spec §4.7): each CACC-capable,
//! unplatooned vehicle scores every platoon within communication range by
//! `alpha * |delta v| + beta * |delta position|` and requests a join with
//! the best-scoring platoon under `threshold`. Conflicting requests for the
//! same tail are resolved lower-id-wins (spec §9 Open Question (b)).

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::fleet::PlatoonRole;
use crate::maneuver::JoinRequest;
use crate::platoon::PlatoonId;

use super::{FleetView, FormationAlgorithm, FormationCommand, SimClock};

pub struct SpeedPosition {
    alpha: f64,
    beta: f64,
    threshold: f64,
}

impl SpeedPosition {
    pub fn new(alpha: f64, beta: f64, threshold: f64) -> Self {
        Self { alpha, beta, threshold }
    }
}

impl Default for SpeedPosition {
    fn default() -> Self {
        Self::new(1.0, 0.01, 5.0)
    }
}

impl FormationAlgorithm for SpeedPosition {
    fn on_step(&mut self, view: &FleetView, _clock: SimClock) -> Vec<FormationCommand> {
        let positions: HashMap<u64, f64> = view.vehicles.iter().map(|v| (v.id, v.position)).collect();

        let mut proposals: Vec<(u64, PlatoonId, f64)> = Vec::new();
        for vehicle in &view.vehicles {
            if !vehicle.cacc_capable || vehicle.platoon_role != PlatoonRole::None {
                continue;
            }
            let mut best: Option<(PlatoonId, f64)> = None;
            for platoon in &view.platoons {
                let Some(&tail_pos) = positions.get(&platoon.tail) else { continue };
                let distance = (vehicle.position - tail_pos).abs();
                if distance > view.communication_range {
                    continue;
                }
                let score = self.alpha * (vehicle.desired_speed - platoon.desired_speed).abs() + self.beta * distance;
                if score < self.threshold && best.map(|(_, s)| score < s).unwrap_or(true) {
                    best = Some((platoon.id, score));
                }
            }
            if let Some((platoon_id, score)) = best {
                proposals.push((vehicle.id, platoon_id, score));
            }
        }

        // Lower vehicle id wins when two vehicles target the same platoon.
        // `IndexMap` so the emitted command order is a deterministic function
        // of `proposals`' order, not of hash iteration (spec §9 determinism).
        let mut by_platoon: IndexMap<PlatoonId, (u64, f64)> = IndexMap::new();
        for (vehicle_id, platoon_id, score) in proposals {
            by_platoon
                .entry(platoon_id)
                .and_modify(|winner| {
                    if vehicle_id < winner.0 {
                        *winner = (vehicle_id, score);
                    }
                })
                .or_insert((vehicle_id, score));
        }

        by_platoon
            .into_iter()
            .map(|(platoon_id, (vehicle_id, _))| {
                FormationCommand::Join(JoinRequest {
                    vehicle: vehicle_id,
                    platoon: platoon_id,
                })
            })
            .collect()
    }
}
