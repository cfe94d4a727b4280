// ==============================================================================
// steering.rs — SPEED-SENSITIVE STEERING (FRONT AXLE)
// ==============================================================================
// effective angle = steer_input * max_steer_angle * attenuation(speed)
//
// attenuation(speed):
//   1.0                         speed <= threshold
//   lerp(1.0, floor, t)         t = (speed - threshold) / 20
//   floor                       speed >= threshold + 20
// ==============================================================================

use crate::tire::types::STEER_ATTENUATION_SPAN;
use crate::vehicle::VehicleConfig;

pub fn speed_attenuation(speed: f32, threshold: f32, floor: f32) -> f32 {
    if !speed.is_finite() {
        return floor;
    }
    let t = ((speed.abs() - threshold) / STEER_ATTENUATION_SPAN).clamp(0.0, 1.0);
    1.0 + (floor - 1.0) * t
}

/// Steer angle in degrees (positive = right).
pub fn steer_angle(cfg: &VehicleConfig, steer_input: f32, speed: f32) -> f32 {
    let steer_input = steer_input.clamp(-1.0, 1.0);
    let attenuation = speed_attenuation(speed, cfg.steer_attenuation_speed, cfg.steer_attenuation_floor);
    steer_input * cfg.max_steer_angle * attenuation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::gt86;

    #[test]
    fn attenuation_decays_linearly_to_floor() {
        assert_eq!(speed_attenuation(0.0, 10.0, 0.6), 1.0);
        assert_eq!(speed_attenuation(10.0, 10.0, 0.6), 1.0);
        assert!((speed_attenuation(20.0, 10.0, 0.6) - 0.8).abs() < 1e-6);
        assert!((speed_attenuation(30.0, 10.0, 0.6) - 0.6).abs() < 1e-6);
        assert!((speed_attenuation(90.0, 10.0, 0.6) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn full_lock_at_low_speed() {
        let c = gt86();
        assert!((steer_angle(&c, 1.0, 2.0) - c.max_steer_angle).abs() < 1e-5);
        assert!((steer_angle(&c, -0.5, 2.0) + 0.5 * c.max_steer_angle).abs() < 1e-5);
    }

    #[test]
    fn high_speed_steering_is_reduced() {
        let c = gt86();
        let fast = steer_angle(&c, 1.0, 45.0);
        assert!((fast - c.max_steer_angle * c.steer_attenuation_floor).abs() < 1e-4);
    }
}
