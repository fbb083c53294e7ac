//! Centralized optimal formation policy (spec §4.7): builds a vehicle ×
//! (platoon + "remain alone" slack) assignment problem and dispatches it to
//! an external [`Solver`] collaborator under a wall-clock budget. On timeout
//! the step falls back to [`super::greedy::Greedy`] and the caller is
//! expected to count a solution-quality statistic from the returned
//! [`OptimalOutcome`]. The numeric solver itself is explicitly out of scope
//! (spec §1); this module only defines the narrow interface it must satisfy.

use std::time::Duration;

use crate::error::SolverError;

use super::greedy::Greedy;
use super::{FleetView, FormationAlgorithm, FormationCommand, SimClock};

/// One candidate assignment in the problem handed to a [`Solver`]: vehicle
/// `vehicle` assigned to `platoon`, or `None` to remain alone (the slack
/// assignment named in spec §4.7).
#[derive(Debug, Clone, Copy)]
pub struct Assignment {
    pub vehicle: u64,
    pub platoon: Option<u64>,
    pub cost: f64,
}

/// The assignment problem built from one scheduler invocation.
#[derive(Debug, Clone, Default)]
pub struct AssignmentProblem {
    pub candidates: Vec<Assignment>,
}

/// External numeric solver collaborator (spec §1: "the optional
/// centralized-optimal solver's actual numeric implementation" is out of
/// scope; only this interface is defined here).
pub trait Solver {
    /// Returns the chosen assignments, or `Err` if the solver itself failed
    /// (as opposed to timing out, which the caller enforces separately via
    /// `time_budget`).
    fn solve(&mut self, problem: &AssignmentProblem, time_budget: Duration) -> Result<Vec<Assignment>, SolverError>;
}

/// Whether the optimal policy's last invocation used the solver or fell back
/// to greedy after a timeout (spec §4.7: "records a solution-quality
/// statistic").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimalOutcome {
    Solved,
    TimedOutFellBackToGreedy,
}

pub struct Optimal<S: Solver> {
    solver: S,
    time_budget: Duration,
    greedy: Greedy,
    last_outcome: OptimalOutcome,
}

impl<S: Solver> Optimal<S> {
    pub fn new(solver: S, time_budget: Duration) -> Self {
        Self {
            solver,
            time_budget,
            greedy: Greedy::default(),
            last_outcome: OptimalOutcome::Solved,
        }
    }

    pub fn last_outcome(&self) -> OptimalOutcome {
        self.last_outcome
    }

    fn build_problem(view: &FleetView) -> AssignmentProblem {
        use crate::fleet::PlatoonRole;

        let mut candidates = Vec::new();
        for vehicle in &view.vehicles {
            if !vehicle.cacc_capable || vehicle.platoon_role != PlatoonRole::None {
                continue;
            }
            candidates.push(Assignment {
                vehicle: vehicle.id,
                platoon: None,
                cost: 0.0,
            });
            for platoon in &view.platoons {
                let Some(tail) = view.vehicles.iter().find(|v| v.id == platoon.tail) else { continue };
                let distance = (vehicle.position - tail.position).abs();
                if distance > view.communication_range {
                    continue;
                }
                candidates.push(Assignment {
                    vehicle: vehicle.id,
                    platoon: Some(platoon.id),
                    cost: (vehicle.desired_speed - platoon.desired_speed).abs() + 0.01 * distance,
                });
            }
        }
        AssignmentProblem { candidates }
    }
}

impl<S: Solver> FormationAlgorithm for Optimal<S> {
    fn on_step(&mut self, view: &FleetView, clock: SimClock) -> Vec<FormationCommand> {
        use crate::maneuver::JoinRequest;

        let problem = Self::build_problem(view);
        match self.solver.solve(&problem, self.time_budget) {
            Ok(assignments) => {
                self.last_outcome = OptimalOutcome::Solved;
                assignments
                    .into_iter()
                    .filter_map(|a| {
                        a.platoon.map(|platoon| {
                            FormationCommand::Join(JoinRequest {
                                vehicle: a.vehicle,
                                platoon,
                            })
                        })
                    })
                    .collect()
            }
            Err(_timeout_or_failure) => {
                self.last_outcome = OptimalOutcome::TimedOutFellBackToGreedy;
                self.greedy.on_step(view, clock)
            }
        }
    }

    fn timed_out_last_step(&self) -> bool {
        self.last_outcome == OptimalOutcome::TimedOutFellBackToGreedy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysTimesOut;
    impl Solver for AlwaysTimesOut {
        fn solve(&mut self, _problem: &AssignmentProblem, _time_budget: Duration) -> Result<Vec<Assignment>, SolverError> {
            Err(SolverError::SolverFailed("budget exceeded".to_string()))
        }
    }

    struct AlwaysRemainAlone;
    impl Solver for AlwaysRemainAlone {
        fn solve(&mut self, problem: &AssignmentProblem, _time_budget: Duration) -> Result<Vec<Assignment>, SolverError> {
            Ok(problem
                .candidates
                .iter()
                .filter(|a| a.platoon.is_none())
                .copied()
                .collect())
        }
    }

    #[test]
    fn timeout_falls_back_to_greedy_and_records_outcome() {
        let view = FleetView {
            vehicles: vec![],
            platoons: vec![],
            communication_range: 50.0,
        };
        let mut alg = Optimal::new(AlwaysTimesOut, Duration::from_millis(1));
        let _ = alg.on_step(&view, SimClock { time: 0.0, step_length: 1.0 });
        assert_eq!(alg.last_outcome(), OptimalOutcome::TimedOutFellBackToGreedy);
    }

    #[test]
    fn successful_solve_is_recorded_as_solved() {
        let view = FleetView {
            vehicles: vec![],
            platoons: vec![],
            communication_range: 50.0,
        };
        let mut alg = Optimal::new(AlwaysRemainAlone, Duration::from_secs(1));
        let commands = alg.on_step(&view, SimClock { time: 0.0, step_length: 1.0 });
        assert!(commands.is_empty());
        assert_eq!(alg.last_outcome(), OptimalOutcome::Solved);
    }
}
