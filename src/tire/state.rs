use crate::tire::types::WheelForces;

/// Per-wheel working state. Rebuilt every tick by its `WheelForceModel`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct WheelState {
    pub forward_slip: f32,
    pub lateral_slip: f32,
    pub steer_angle: f32,       // degrees
    pub motor_torque: f32,
    pub brake_torque: f32,
    pub forward_stiffness: f32,
    pub lateral_stiffness: f32,
}

impl WheelState {
    pub fn forces(&self) -> WheelForces {
        WheelForces {
            motor_torque: self.motor_torque,
            brake_torque: self.brake_torque,
            steer_angle: self.steer_angle,
            forward_stiffness: self.forward_stiffness,
            lateral_stiffness: self.lateral_stiffness,
            forward_slip: self.forward_slip,
            lateral_slip: self.lateral_slip,
        }
    }
}
