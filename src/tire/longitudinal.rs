// ==============================================================================
// longitudinal.rs — LONGITUDINAL (ENGINE + BRAKE) WHEEL TORQUES
// ==============================================================================
// Computes the torque demand for a single wheel:
// 1) Engine torque (drive wheels only), shaped by the engine curve and cut
//    hard at the configured max speed
// 2) Brake torque, released while the wheel is near lockup (ABS pulse)
// 3) Traction control, a vehicle-level scale on drive torque decided from the
//    average forward slip of all four wheels
//
// Outputs are torques in N*m; the integrator turns them into wheel spin.
// ===============================================================================

use crate::tire::types::{ABS_LOCKUP_THRESHOLD, TRACTION_SLIP_THRESHOLD, TRACTION_TORQUE_SCALE};
use crate::vehicle::VehicleConfig;

pub fn motor_torque(cfg: &VehicleConfig, throttle: f32, speed_ratio: f32, speed: f32) -> f32 {
    // hard ceiling
    if speed >= cfg.max_speed {
        return 0.0;
    }
    let speed_ratio = if speed_ratio.is_finite() { speed_ratio.clamp(0.0, 1.0) } else { 0.0 };
    throttle * cfg.max_engine_power * cfg.engine_curve.evaluate(speed_ratio)
}

pub fn brake_torque(cfg: &VehicleConfig, brake: f32, forward_slip: f32) -> f32 {
    if forward_slip < ABS_LOCKUP_THRESHOLD {
        return 0.0;
    }
    brake * cfg.max_brake_force
}

/// Scale applied to drive torque this tick.
pub fn traction_scale(average_forward_slip: f32) -> f32 {
    if average_forward_slip > TRACTION_SLIP_THRESHOLD {
        TRACTION_TORQUE_SCALE
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tire::Curve;
    use crate::vehicle::gt86;

    fn cfg() -> VehicleConfig {
        let mut c = gt86();
        c.max_engine_power = 1000.0;
        c.max_brake_force = 3000.0;
        c.max_speed = 50.0;
        c.engine_curve = Curve::new(vec![[0.0, 0.3], [1.0, 0.9]]);
        c
    }

    #[test]
    fn at_rest_full_throttle_uses_curve_origin() {
        assert!((motor_torque(&cfg(), 1.0, 0.0, 0.0) - 300.0).abs() < 1e-3);
    }

    #[test]
    fn torque_follows_throttle_and_curve() {
        let c = cfg();
        for throttle in [0.0, 0.25, 0.5, 1.0] {
            for ratio in [0.0, 0.2, 0.5, 0.9] {
                let expected = throttle * 1000.0 * c.engine_curve.evaluate(ratio);
                let got = motor_torque(&c, throttle, ratio, ratio * 50.0);
                assert!((got - expected).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn speed_ceiling_cuts_torque() {
        let c = cfg();
        assert_eq!(motor_torque(&c, 1.0, 1.0, 50.0), 0.0);
        assert_eq!(motor_torque(&c, 1.0, 1.0, 63.0), 0.0);
    }

    #[test]
    fn out_of_domain_ratio_is_clamped() {
        let c = cfg();
        let high = motor_torque(&c, 1.0, 4.0, 10.0);
        assert!((high - 900.0).abs() < 1e-3);
        let low = motor_torque(&c, 1.0, -2.0, 10.0);
        assert!((low - 300.0).abs() < 1e-3);
    }

    #[test]
    fn abs_releases_near_lockup() {
        let c = cfg();
        assert_eq!(brake_torque(&c, 1.0, -0.21), 0.0);
        assert_eq!(brake_torque(&c, 0.3, -0.9), 0.0);
        assert!((brake_torque(&c, 1.0, -0.2) - 3000.0).abs() < 1e-3);
        assert!((brake_torque(&c, 0.5, 0.0) - 1500.0).abs() < 1e-3);
    }

    #[test]
    fn traction_control_halves_above_threshold() {
        assert_eq!(traction_scale(0.26), 0.5);
        assert_eq!(traction_scale(0.25), 1.0);
        assert_eq!(traction_scale(-1.0), 1.0);
    }
}
