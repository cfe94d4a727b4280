// ==============================================================================
// friction.rs — GRIP-CURVE FRICTION STIFFNESS
// ------------------------------------------------------------------------------
// stiffness = grip_curve(slip_normalized) * grip_multiplier, for both the
// forward and lateral direction. A held handbrake pins rear lateral stiffness
// to HANDBRAKE_REAR_STIFFNESS no matter what the curve says.
//
// Pure function of its inputs: no timers, no smoothing.
// ==============================================================================

use crate::tire::types::{clamp_grip, WheelId, HANDBRAKE_REAR_STIFFNESS};
use crate::vehicle::VehicleConfig;

/// Returns (forward_stiffness, lateral_stiffness).
pub fn friction_stiffness(
    cfg: &VehicleConfig,
    wheel: WheelId,
    slip_normalized: f32,
    grip_multiplier: f32,
    handbrake: bool,
) -> (f32, f32) {
    let grip = cfg.grip_curve.evaluate(slip_normalized) * clamp_grip(grip_multiplier);

    let lateral = if handbrake && wheel.is_rear() {
        HANDBRAKE_REAR_STIFFNESS
    } else {
        grip
    };

    (grip, lateral)
}
