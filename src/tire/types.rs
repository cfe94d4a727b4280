//! Core shared types for `tire` (engine-agnostic).
// tire/types.rs
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;

/// Below this magnitude a speed or direction counts as zero.
pub const EPSILON: f32 = 1e-4;

// ----- tuning constants ------------------------------------------------------
/// Forward slip below this means the wheel is about to lock; ABS releases.
pub const ABS_LOCKUP_THRESHOLD: f32 = -0.2;
/// Average forward slip above this engages traction control.
pub const TRACTION_SLIP_THRESHOLD: f32 = 0.25;
/// Torque scale applied while traction control is engaged.
pub const TRACTION_TORQUE_SCALE: f32 = 0.5;
/// |slip angle| strictly above this (degrees) is a drift.
pub const DRIFT_THRESHOLD_DEG: f32 = 8.0;
/// Slip angle (degrees) that maps to 1.0 on the grip curve.
pub const SLIP_ANGLE_RANGE_DEG: f32 = 30.0;
/// Rear lateral stiffness while the handbrake is held.
pub const HANDBRAKE_REAR_STIFFNESS: f32 = 0.3;
/// Rear brake torque multiplier while the handbrake is held.
pub const HANDBRAKE_BRAKE_MULTIPLIER: f32 = 2.0;
/// Speed band (units/s) over which steering decays to its floor.
pub const STEER_ATTENUATION_SPAN: f32 = 20.0;
/// Grip multipliers from any source are clamped to this range.
pub const GRIP_MULTIPLIER_MIN: f32 = 0.0;
pub const GRIP_MULTIPLIER_MAX: f32 = 2.0;

#[inline]
pub fn clamp_grip(g: f32) -> f32 {
    if g.is_finite() {
        g.clamp(GRIP_MULTIPLIER_MIN, GRIP_MULTIPLIER_MAX)
    } else {
        1.0
    }
}

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn index(&self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, WheelId::RL | WheelId::RR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// ----- driver command -----------------------
// ============================================

/// One tick of driver intent. Produced by a human adapter or an
/// `AutonomousDriver`, consumed by `VehicleDynamicsModel` the same tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub throttle: f32,  // 0..1
    pub brake: f32,     // 0..1
    pub steer: f32,     // -1..1 (positive = right)
    #[serde(default)]
    pub handbrake: bool,
    #[serde(default)]
    pub boost: bool,
}

impl Command {
    pub const IDLE: Command = Command {
        throttle: 0.0,
        brake: 0.0,
        steer: 0.0,
        handbrake: false,
        boost: false,
    };

    /// Clamp every axis into range; non-finite axes become zero.
    pub fn sanitized(self) -> Self {
        fn axis(v: f32, lo: f32, hi: f32) -> f32 {
            if v.is_finite() { v.clamp(lo, hi) } else { 0.0 }
        }
        Self {
            throttle: axis(self.throttle, 0.0, 1.0),
            brake: axis(self.brake, 0.0, 1.0),
            steer: axis(self.steer, -1.0, 1.0),
            ..self
        }
    }
}

// ============================================
// ----- integrator <-> model -----------------
// ============================================

/// Ground-contact speeds for one wheel, measured by the integrator in the
/// wheel's own (steered) frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelContact {
    pub long_speed: f32,    // m/s along wheel forward
    pub lat_speed: f32,     // m/s along wheel right
    pub surface_speed: f32, // wheel spin * radius
}

/// Rigid-body state of one chassis as seen by the dynamics model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisKinematics {
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading: f32, // radians about +Y, 0 = facing +Z
    pub wheels: [WheelContact; 4],
}

impl Default for ChassisKinematics {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            heading: 0.0,
            wheels: [WheelContact::default(); 4],
        }
    }
}

/// Per-wheel force parameters handed to the integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelForces {
    pub motor_torque: f32,
    pub brake_torque: f32,
    pub steer_angle: f32, // degrees, positive = right
    pub forward_stiffness: f32,
    pub lateral_stiffness: f32,
    pub forward_slip: f32,
    pub lateral_slip: f32,
}

/// Everything the integrator needs for one vehicle for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleForces {
    pub wheels: [WheelForces; 4],
    /// World-space force, zero unless boost is active.
    pub boost_force: Vec3,
}

impl VehicleForces {
    pub fn wheel(&self, id: WheelId) -> &WheelForces {
        &self.wheels[id.index()]
    }
}
