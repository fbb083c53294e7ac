//! Centralized greedy formation policy (spec §4.7): an infrastructure with
//! full knowledge iterates vehicles in arrival order (ascending id, since
//! ids are assigned in arrival order by the spawner) and assigns each to the
//! best-scoring currently-formed platoon, the same `alpha*|dv|+beta*|dp|`
//! scoring [`super::speed_position::SpeedPosition`] uses, just applied by
//! one omniscient decision-maker instead of per-vehicle.

use std::collections::HashSet;

use crate::fleet::PlatoonRole;
use crate::maneuver::JoinRequest;

use super::{FleetView, FormationAlgorithm, FormationCommand, SimClock};

pub struct Greedy {
    alpha: f64,
    beta: f64,
    threshold: f64,
}

impl Greedy {
    pub fn new(alpha: f64, beta: f64, threshold: f64) -> Self {
        Self { alpha, beta, threshold }
    }
}

impl Default for Greedy {
    fn default() -> Self {
        Self::new(1.0, 0.01, 5.0)
    }
}

impl FormationAlgorithm for Greedy {
    fn on_step(&mut self, view: &FleetView, _clock: SimClock) -> Vec<FormationCommand> {
        let mut candidates: Vec<_> = view
            .vehicles
            .iter()
            .filter(|v| v.cacc_capable && v.platoon_role == PlatoonRole::None)
            .collect();
        candidates.sort_by_key(|v| v.id);

        let tail_position = |id: u64| view.vehicles.iter().find(|v| v.id == id).map(|v| v.position);

        let mut taken: HashSet<u64> = HashSet::new();
        let mut commands = Vec::new();

        for vehicle in candidates {
            let mut best: Option<(u64, f64)> = None;
            for platoon in &view.platoons {
                if taken.contains(&platoon.tail) {
                    continue;
                }
                let Some(tail_pos) = tail_position(platoon.tail) else { continue };
                let distance = (vehicle.position - tail_pos).abs();
                if distance > view.communication_range {
                    continue;
                }
                let score = self.alpha * (vehicle.desired_speed - platoon.desired_speed).abs() + self.beta * distance;
                if score < self.threshold && best.map(|(_, s)| score < s).unwrap_or(true) {
                    best = Some((platoon.id, score));
                }
            }
            if let Some((platoon_id, _)) = best {
                let platoon = view.platoons.iter().find(|p| p.id == platoon_id).unwrap();
                taken.insert(platoon.tail);
                commands.push(FormationCommand::Join(JoinRequest {
                    vehicle: vehicle.id,
                    platoon: platoon_id,
                }));
            }
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::{PlatoonSnapshot, VehicleSnapshot};

    fn vehicle(id: u64, position: f64) -> VehicleSnapshot {
        VehicleSnapshot {
            id,
            position,
            lane: 0,
            speed: 30.0,
            desired_speed: 30.0,
            platoon_role: PlatoonRole::None,
            platoon_id: None,
            cacc_capable: true,
        }
    }

    #[test]
    fn each_platoon_assigned_to_at_most_one_vehicle() {
        let mut tail = vehicle(100, 100.0);
        tail.platoon_role = PlatoonRole::Leader;
        tail.platoon_id = Some(1);
        let view = FleetView {
            vehicles: vec![vehicle(1, 95.0), vehicle(2, 96.0), tail],
            platoons: vec![PlatoonSnapshot {
                id: 1,
                leader: 100,
                tail: 100,
                desired_speed: 30.0,
                lane: 0,
                size: 1,
            }],
            communication_range: 50.0,
        };
        let mut alg = Greedy::default();
        let commands = alg.on_step(&view, SimClock { time: 0.0, step_length: 1.0 });
        assert_eq!(commands.len(), 1);
        match commands[0] {
            FormationCommand::Join(req) => assert_eq!(req.vehicle, 1),
            _ => panic!("expected a join command"),
        }
    }
}
