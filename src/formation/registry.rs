//! Build-time name registry for distributed formation algorithms (spec §9:
//! "avoid reflection, require explicit registration of names at build
//! time"). [`Config::validate`](crate::config::Config::validate) calls
//! [`resolve`] so an unknown `formation_algorithm` name is a *Config* error
//! (exit 1) rather than a runtime panic, mirroring the way the teacher
//! resolves `BehaviourType`/`AgentType` through an exhaustive match table.

use super::speed_position::SpeedPosition;
use super::FormationAlgorithm;

/// Resolves a distributed formation algorithm by its configured name.
pub fn resolve(name: &str) -> Option<Box<dyn FormationAlgorithm>> {
    match name {
        "SpeedPosition" => Some(Box::new(SpeedPosition::default())),
        _ => None,
    }
}
