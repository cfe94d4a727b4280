// ==============================================================================
// kinematics.rs — CHASSIS/WHEEL BASIS + SLIP DECOMPOSITION (WORLD SPACE)
// ------------------------------------------------------------------------------
// Conventions (y up):
//   heading h is yaw about +Y, h = 0 faces +Z
//   forward = (sin h, 0, cos h)
//   right   = (-cos h, 0, sin h)      (+X is left when facing +Z)
// A positive steer angle turns the wheel toward `right`, i.e. lowers heading.
//
// slip_components(v, forward, right):
//   v_long = dot(v, forward), v_lat = dot(v, right)
//
// slip_ratios(contact):
//   forward = (surface - v_long) / max(|surface|, |v_long|)
//   lateral = v_lat / |v|
//   both are zero when their denominator is ~0 (vehicle at rest).
// ==============================================================================

use crate::tire::types::{Vec3, WheelContact, EPSILON};

#[inline]
pub fn chassis_basis(heading: f32) -> (Vec3, Vec3) {
    let (s, c) = heading.sin_cos();
    (Vec3::new(s, 0.0, c), Vec3::new(-c, 0.0, s))
}

/// Basis of a wheel steered by `steer_deg` (positive = right).
#[inline]
pub fn wheel_basis(heading: f32, steer_deg: f32) -> (Vec3, Vec3) {
    chassis_basis(heading - steer_deg.to_radians())
}

/// Heading of a planar direction; `None` for a zero-length vector.
#[inline]
pub fn heading_of(dir: Vec3) -> Option<f32> {
    let planar = Vec3::new(dir.x, 0.0, dir.z);
    if planar.norm() < EPSILON {
        return None;
    }
    Some(planar.x.atan2(planar.z))
}

#[inline]
pub fn slip_components(v: Vec3, forward: Vec3, right: Vec3) -> (f32, f32) {
    (v.dot(&forward), v.dot(&right))
}

pub fn slip_ratios(contact: &WheelContact) -> (f32, f32) {
    let denom = contact.surface_speed.abs().max(contact.long_speed.abs());
    let forward = if denom > EPSILON && denom.is_finite() {
        (contact.surface_speed - contact.long_speed) / denom
    } else {
        0.0
    };

    let ground = (contact.long_speed * contact.long_speed
        + contact.lat_speed * contact.lat_speed)
        .sqrt();
    let lateral = if ground > EPSILON && ground.is_finite() {
        contact.lat_speed / ground
    } else {
        0.0
    };

    (forward, lateral)
}

/// Signed slip angle in degrees: atan2(lateral, forward) of the chassis-local
/// velocity. Positive when the chassis slides toward its right.
pub fn slip_angle_deg(velocity: Vec3, heading: f32) -> f32 {
    let planar = Vec3::new(velocity.x, 0.0, velocity.z);
    if planar.norm() < EPSILON {
        return 0.0;
    }
    let (forward, right) = chassis_basis(heading);
    let (v_long, v_lat) = slip_components(planar, forward, right);
    v_lat.atan2(v_long).to_degrees()
}

/// Signed angle in degrees from `forward` to `to_target` in the ground plane,
/// positive when the target lies to the right. Zero for degenerate vectors.
pub fn signed_angle_deg(heading: f32, to_target: Vec3) -> f32 {
    let planar = Vec3::new(to_target.x, 0.0, to_target.z);
    if planar.norm() < EPSILON {
        return 0.0;
    }
    let (forward, right) = chassis_basis(heading);
    let (along, across) = slip_components(planar, forward, right);
    across.atan2(along).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_rest_slip_is_zero() {
        let (f, l) = slip_ratios(&WheelContact::default());
        assert_eq!((f, l), (0.0, 0.0));
        assert_eq!(slip_angle_deg(Vec3::zeros(), 1.2), 0.0);
    }

    #[test]
    fn locked_wheel_reports_full_negative_slip() {
        let c = WheelContact { long_speed: 12.0, lat_speed: 0.0, surface_speed: 0.0 };
        let (f, _) = slip_ratios(&c);
        assert!((f + 1.0).abs() < 1e-6);
    }

    #[test]
    fn spinning_wheel_reports_positive_slip() {
        let c = WheelContact { long_speed: 10.0, lat_speed: 0.0, surface_speed: 20.0 };
        let (f, _) = slip_ratios(&c);
        assert!((f - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sliding_right_is_positive_slip_angle() {
        // facing +Z, moving forward and toward -X (right)
        let v = Vec3::new(-1.0, 0.0, 1.0);
        let a = slip_angle_deg(v, 0.0);
        assert!((a - 45.0).abs() < 1e-4);
    }

    #[test]
    fn target_to_the_right_is_positive() {
        assert!(signed_angle_deg(0.0, Vec3::new(-1.0, 0.0, 1.0)) > 0.0);
        assert!(signed_angle_deg(0.0, Vec3::new(1.0, 0.0, 1.0)) < 0.0);
        assert_eq!(signed_angle_deg(0.0, Vec3::zeros()), 0.0);
    }

    #[test]
    fn positive_steer_points_wheel_right() {
        let (_, right) = chassis_basis(0.0);
        let (wheel_fwd, _) = wheel_basis(0.0, 20.0);
        assert!(wheel_fwd.dot(&right) > 0.0);
    }
}
