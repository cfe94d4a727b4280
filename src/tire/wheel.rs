use std::sync::Arc;

use crate::tire::friction::friction_stiffness;
use crate::tire::kinematics::slip_ratios;
use crate::tire::longitudinal::{brake_torque, motor_torque};
use crate::tire::state::WheelState;
use crate::tire::steering::steer_angle;
use crate::tire::types::{WheelContact, WheelForces, WheelId, HANDBRAKE_BRAKE_MULTIPLIER};
use crate::vehicle::VehicleConfig;

/// Torque / brake / steer / grip decisions for one wheel.
///
/// Every `apply_*` call overwrites the matching field of `WheelState`, so a
/// tick is: `update_slip`, then the torques, steer and friction in any order.
#[derive(Debug, Clone)]
pub struct WheelForceModel {
    id: WheelId,
    config: Arc<VehicleConfig>,
    state: WheelState,
}

impl WheelForceModel {
    pub fn new(id: WheelId, config: Arc<VehicleConfig>) -> Self {
        Self { id, config, state: WheelState::default() }
    }

    pub fn id(&self) -> WheelId {
        self.id
    }

    pub fn state(&self) -> &WheelState {
        &self.state
    }

    pub fn forces(&self) -> WheelForces {
        self.state.forces()
    }

    pub fn is_driven(&self) -> bool {
        self.config.drivetrain.drives(self.id)
    }

    pub fn is_steered(&self) -> bool {
        self.id.is_front()
    }

    pub fn update_slip(&mut self, contact: &WheelContact) -> (f32, f32) {
        let (forward, lateral) = slip_ratios(contact);
        self.state.forward_slip = forward;
        self.state.lateral_slip = lateral;
        (forward, lateral)
    }

    pub fn apply_motor_torque(&mut self, throttle: f32, speed_ratio: f32, speed: f32) -> f32 {
        let torque = if self.is_driven() {
            motor_torque(&self.config, throttle, speed_ratio, speed)
        } else {
            0.0
        };
        self.state.motor_torque = torque;
        torque
    }

    /// Traction control hook: rescale whatever torque this tick decided.
    pub fn scale_motor_torque(&mut self, scale: f32) {
        self.state.motor_torque *= scale;
    }

    pub fn apply_brake_torque(&mut self, brake: f32, forward_slip: f32) -> f32 {
        let torque = brake_torque(&self.config, brake, forward_slip);
        self.state.brake_torque = torque;
        torque
    }

    /// Locked rear wheel for the handbrake; bypasses ABS.
    pub fn apply_handbrake(&mut self) -> f32 {
        if !self.id.is_rear() {
            return self.state.brake_torque;
        }
        let torque = self.config.max_brake_force * HANDBRAKE_BRAKE_MULTIPLIER;
        self.state.brake_torque = torque;
        torque
    }

    pub fn apply_steer(&mut self, steer: f32, speed: f32) -> f32 {
        let angle = if self.is_steered() {
            steer_angle(&self.config, steer, speed)
        } else {
            0.0
        };
        self.state.steer_angle = angle;
        angle
    }

    pub fn update_friction(&mut self, slip_normalized: f32, grip_multiplier: f32, handbrake: bool) -> (f32, f32) {
        let (forward, lateral) =
            friction_stiffness(&self.config, self.id, slip_normalized, grip_multiplier, handbrake);
        self.state.forward_stiffness = forward;
        self.state.lateral_stiffness = lateral;
        (forward, lateral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{gt86, Drivetrain};

    #[test]
    fn undriven_wheels_get_no_torque() {
        let cfg = Arc::new(gt86());
        let mut front = WheelForceModel::new(WheelId::FL, cfg.clone());
        let mut rear = WheelForceModel::new(WheelId::RL, cfg);
        assert_eq!(front.apply_motor_torque(1.0, 0.0, 0.0), 0.0);
        assert!(rear.apply_motor_torque(1.0, 0.0, 0.0) > 0.0);
    }

    #[test]
    fn all_wheel_drive_drives_front() {
        let mut cfg = gt86();
        cfg.drivetrain = Drivetrain::All;
        let mut front = WheelForceModel::new(WheelId::FR, Arc::new(cfg));
        assert!(front.apply_motor_torque(1.0, 0.0, 0.0) > 0.0);
    }

    #[test]
    fn rear_wheels_do_not_steer() {
        let cfg = Arc::new(gt86());
        let mut rear = WheelForceModel::new(WheelId::RR, cfg.clone());
        let mut front = WheelForceModel::new(WheelId::FR, cfg);
        assert_eq!(rear.apply_steer(1.0, 0.0), 0.0);
        assert!(front.apply_steer(1.0, 0.0) > 0.0);
    }

    #[test]
    fn handbrake_doubles_rear_brake() {
        let mut cfg = gt86();
        cfg.max_brake_force = 3000.0;
        let cfg = Arc::new(cfg);
        let mut rear = WheelForceModel::new(WheelId::RL, cfg.clone());
        let mut front = WheelForceModel::new(WheelId::FL, cfg);
        assert_eq!(rear.apply_handbrake(), 6000.0);
        front.apply_brake_torque(0.0, 0.0);
        assert_eq!(front.apply_handbrake(), 0.0);
    }

    #[test]
    fn slip_state_tracks_contact() {
        let mut w = WheelForceModel::new(WheelId::RL, Arc::new(gt86()));
        w.update_slip(&WheelContact { long_speed: 10.0, lat_speed: 0.0, surface_speed: 0.0 });
        assert!((w.state().forward_slip + 1.0).abs() < 1e-6);
        w.update_slip(&WheelContact::default());
        assert_eq!(w.state().forward_slip, 0.0);
    }
}
