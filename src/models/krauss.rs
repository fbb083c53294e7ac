//! Human car-following: the Krauss safe-speed model plus stochastic
//! imperfection (spec §4.2).

use rand::Rng;

use crate::rng::SimRng;

/// Krauss safe speed: `v_lead + (g - v_lead*tau) / (v_bar/b + tau)`.
pub fn safe_speed(gap: f64, own_speed: f64, lead_speed: f64, tau: f64, decel: f64) -> f64 {
    let v_bar = (own_speed + lead_speed) / 2.0;
    let denom = v_bar / decel + tau;
    if denom <= 0.0 {
        return lead_speed;
    }
    lead_speed + (gap - lead_speed * tau) / denom
}

/// Full Krauss update for one vehicle: desired-speed cap, acceleration cap,
/// safe-speed cap, then the stochastic imperfection subtraction.
#[allow(clippy::too_many_arguments)]
pub fn next_speed(
    speed: f64,
    desired_speed: f64,
    gap: f64,
    lead_speed: f64,
    max_accel: f64,
    max_decel: f64,
    tau: f64,
    sigma: f64,
    dt: f64,
    rng: &mut SimRng,
) -> f64 {
    let v_safe = safe_speed(gap, speed, lead_speed, tau, max_decel);
    let v_new = desired_speed.min(speed + max_accel * dt).min(v_safe).max(0.0);
    let eta: f64 = rng.inner_mut().gen_range(0.0..=1.0);
    (v_new - eta * sigma).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_speed_matches_lead_when_gap_equals_reaction_distance() {
        let v = safe_speed(10.0, 10.0, 10.0, 1.0, 4.0);
        assert!((v - 10.0).abs() < 1e-9);
    }

    #[test]
    fn next_speed_never_exceeds_desired() {
        let mut rng = SimRng::new(1);
        let v = next_speed(0.0, 20.0, 1000.0, 20.0, 2.5, 4.0, 1.0, 0.0, 1.0, &mut rng);
        assert!(v <= 20.0 + 1e-9);
    }

    #[test]
    fn next_speed_never_negative() {
        let mut rng = SimRng::new(1);
        let v = next_speed(5.0, 30.0, 0.0, 0.0, 2.5, 4.0, 1.0, 0.9, 1.0, &mut rng);
        assert!(v >= 0.0);
    }
}
