//! Vehicle-type registry.
//!
//! Immutable kinematic parameters per vehicle-type/capability, looked up the
//! same way the teacher library resolves [`BehaviourType`]-shaped parameter
//! tables: an enum plus a `match`-table constructor, never reflection.

use std::fmt;

/// Capability class a vehicle is equipped with. Determines which
/// car-following model (`crate::models`) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleTypeId {
    /// Manually driven, Krauss car-following with stochastic imperfection.
    Human,
    /// Adaptive Cruise Control: headway-time based, no stochastic term.
    Acc,
    /// Cooperative ACC: spacing-based when following a platoon leader.
    Cacc,
}

impl fmt::Display for VehicleTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VehicleTypeId::Human => "human",
            VehicleTypeId::Acc => "acc",
            VehicleTypeId::Cacc => "cacc",
        };
        write!(f, "{}", s)
    }
}

/// Emission class used by the HBEFA-style polynomial emission model in
/// [`crate::statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmissionClass {
    PcEuro6Petrol,
    PcEuro6Diesel,
}

/// Immutable kinematic parameters for a [`VehicleTypeId`].
#[derive(Debug, Clone, Copy)]
pub struct VehicleTypeParams {
    /// Vehicle length (m), used by the collision detector and CACC spacing.
    pub length: f64,
    /// Maximum speed (m/s) the vehicle type can ever reach.
    pub max_speed: f64,
    /// Maximum acceleration (m/s^2).
    pub max_accel: f64,
    /// Maximum comfortable deceleration (m/s^2), `b` in the Krauss formula.
    pub max_decel: f64,
    /// Minimum gap (m) kept to the vehicle ahead even at a stop.
    pub min_gap: f64,
    /// Reaction time (s), `tau` in the Krauss formula / headway time for ACC.
    pub headway_time: f64,
    /// Speed imperfection `sigma` in `[0, 1]`, human drivers only.
    pub speed_imperfection: f64,
    /// Emission class used for fuel/CO2/NOx accounting.
    pub emission_class: EmissionClass,
}

impl VehicleTypeParams {
    fn human() -> Self {
        Self {
            length: 4.0,
            max_speed: 55.0,
            max_accel: 2.5,
            max_decel: 4.0,
            min_gap: 2.0,
            headway_time: 1.0,
            speed_imperfection: 0.2,
            emission_class: EmissionClass::PcEuro6Petrol,
        }
    }

    fn acc() -> Self {
        Self {
            length: 4.0,
            max_speed: 55.0,
            max_accel: 2.5,
            max_decel: 4.0,
            min_gap: 2.0,
            headway_time: 1.0,
            speed_imperfection: 0.0,
            emission_class: EmissionClass::PcEuro6Petrol,
        }
    }

    fn cacc() -> Self {
        Self {
            length: 4.0,
            max_speed: 55.0,
            max_accel: 3.0,
            max_decel: 4.5,
            min_gap: 1.0,
            headway_time: 0.5,
            speed_imperfection: 0.0,
            emission_class: EmissionClass::PcEuro6Diesel,
        }
    }
}

/// Lookup table of [`VehicleTypeParams`] keyed by [`VehicleTypeId`].
///
/// # Example
/// ```
/// use platoon_formation_sim_core::vehicle_type::{VehicleTypeRegistry, VehicleTypeId};
/// let registry = VehicleTypeRegistry::default();
/// let params = registry.params(VehicleTypeId::Cacc);
/// assert!(params.headway_time < registry.params(VehicleTypeId::Human).headway_time);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct VehicleTypeRegistry;

impl VehicleTypeRegistry {
    /// Returns the immutable parameters for a vehicle type.
    pub fn params(&self, id: VehicleTypeId) -> VehicleTypeParams {
        match id {
            VehicleTypeId::Human => VehicleTypeParams::human(),
            VehicleTypeId::Acc => VehicleTypeParams::acc(),
            VehicleTypeId::Cacc => VehicleTypeParams::cacc(),
        }
    }
}

impl Default for VehicleTypeRegistry {
    fn default() -> Self {
        VehicleTypeRegistry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_lowercase_name() {
        assert_eq!(format!("{}", VehicleTypeId::Human), "human");
        assert_eq!(format!("{}", VehicleTypeId::Acc), "acc");
        assert_eq!(format!("{}", VehicleTypeId::Cacc), "cacc");
    }

    #[test]
    fn cacc_has_tighter_headway_than_human() {
        let registry = VehicleTypeRegistry::default();
        let cacc = registry.params(VehicleTypeId::Cacc);
        let human = registry.params(VehicleTypeId::Human);
        assert!(cacc.headway_time < human.headway_time);
        assert_eq!(human.speed_imperfection, 0.2);
        assert_eq!(cacc.speed_imperfection, 0.0);
    }
}
