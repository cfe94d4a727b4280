// ==============================================================================
// dynamics.rs — VEHICLE DYNAMICS MODEL (FOUR WHEELS, ONE FIXED TICK)
// ==============================================================================
// Per tick, in order:
//   1) speed ratio = clamp(speed / max_speed, 0, 1)
//   2) drive torque per wheel, halved by traction control when the average
//      forward slip of all four wheels is above threshold
//   3) brake torque per wheel (ABS on the average forward slip)
//   4) steer angle on the front axle (speed attenuated)
//   5) handbrake: doubled rear brake + pinned rear lateral stiffness
//   6) slip angle from chassis-local velocity, drift iff |slip| > 8 deg
//   7) grip: grip_curve(|slip| / 30) * surface grip * drift multiplier
//   8) boost timers
//   9) hand per-wheel force parameters + boost force to the integrator
//  10) publish VehicleState
//
// The integration itself belongs to the physics collaborator (physics.rs).
// ==============================================================================

use std::sync::Arc;

use serde::Serialize;

use crate::error::ConfigError;
use crate::tire::kinematics::{chassis_basis, slip_angle_deg};
use crate::tire::longitudinal::traction_scale;
use crate::tire::{
    clamp_grip, ChassisKinematics, Command, Vec3, VehicleForces, WheelForceModel, WheelForces,
    WheelId, DRIFT_THRESHOLD_DEG, SLIP_ANGLE_RANGE_DEG,
};
use crate::vehicle::VehicleConfig;

#[inline]
pub fn is_drifting(slip_angle_deg: f32) -> bool {
    slip_angle_deg.abs() > DRIFT_THRESHOLD_DEG
}

/// Kinematic + gameplay state of one vehicle. Written only by its
/// `VehicleDynamicsModel`; everyone else reads copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub heading: f32,           // radians
    pub speed: f32,             // m/s, planar
    pub slip_angle: f32,        // degrees, signed
    pub drifting: bool,
    pub boost_active: bool,
    pub boost_timer: f32,
    pub boost_recharge_timer: f32,
    pub surface_grip: f32,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            heading: 0.0,
            speed: 0.0,
            slip_angle: 0.0,
            drifting: false,
            boost_active: false,
            boost_timer: 0.0,
            boost_recharge_timer: 0.0,
            surface_grip: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VehicleDynamicsModel {
    config: Arc<VehicleConfig>,
    wheels: [WheelForceModel; 4],
    state: VehicleState,
    traction_control_active: bool,
}

impl VehicleDynamicsModel {
    pub fn new(config: Arc<VehicleConfig>) -> Result<Self, ConfigError> {
        config.validate()?;
        let wheels = WheelId::ALL.map(|id| WheelForceModel::new(id, config.clone()));
        Ok(Self {
            config,
            wheels,
            state: VehicleState::default(),
            traction_control_active: false,
        })
    }

    pub fn config(&self) -> &Arc<VehicleConfig> {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn wheel(&self, id: WheelId) -> &WheelForceModel {
        &self.wheels[id.index()]
    }

    pub fn traction_control_active(&self) -> bool {
        self.traction_control_active
    }

    /// Initial pose, used once by the spawner before the first tick.
    pub fn place(&mut self, position: Vec3, heading: f32) {
        self.state.position = position;
        self.state.heading = heading;
    }

    /// Surface zone override; 1.0 when no zone applies.
    pub fn set_surface_grip(&mut self, grip: f32) {
        self.state.surface_grip = clamp_grip(grip);
    }

    pub fn boost_charge_fraction(&self) -> f32 {
        let s = &self.state;
        let fraction = if s.boost_active {
            if self.config.boost_duration > 0.0 { s.boost_timer / self.config.boost_duration } else { 0.0 }
        } else if s.boost_recharge_timer > 0.0 && self.config.boost_recharge > 0.0 {
            1.0 - s.boost_recharge_timer / self.config.boost_recharge
        } else {
            1.0
        };
        fraction.clamp(0.0, 1.0)
    }

    /// Grip step on its own: derives the multiplier from current state and
    /// writes friction stiffness on all four wheels. Pure in its inputs.
    pub fn update_grip(&mut self, slip_angle_deg: f32, handbrake: bool) {
        let drifting = is_drifting(slip_angle_deg);
        let slip_normalized = (slip_angle_deg.abs() / SLIP_ANGLE_RANGE_DEG).clamp(0.0, 1.0);
        let drift_factor = if drifting { self.config.drift_grip_multiplier } else { 1.0 };
        let grip_multiplier = clamp_grip(self.state.surface_grip * drift_factor);

        for w in self.wheels.iter_mut() {
            w.update_friction(slip_normalized, grip_multiplier, handbrake);
        }
    }

    pub fn step(&mut self, command: &Command, kin: &ChassisKinematics, dt: f32) -> VehicleForces {
        let cmd = command.sanitized();
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let velocity = if kin.velocity.iter().all(|v| v.is_finite()) { kin.velocity } else { Vec3::zeros() };
        let heading = if kin.heading.is_finite() { kin.heading } else { self.state.heading };
        let speed = Vec3::new(velocity.x, 0.0, velocity.z).norm();

        // 1) speed ratio
        let speed_ratio = (speed / self.config.max_speed).clamp(0.0, 1.0);

        // slip from the contacts the integrator measured
        let mut slip_sum = 0.0;
        for (w, contact) in self.wheels.iter_mut().zip(kin.wheels.iter()) {
            slip_sum += w.update_slip(contact).0;
        }
        let average_forward_slip = slip_sum / self.wheels.len() as f32;

        // 2) drive torque + traction control
        for w in self.wheels.iter_mut() {
            w.apply_motor_torque(cmd.throttle, speed_ratio, speed);
        }
        let tc = traction_scale(average_forward_slip);
        self.traction_control_active = tc < 1.0;
        if self.traction_control_active {
            for w in self.wheels.iter_mut() {
                w.scale_motor_torque(tc);
            }
        }

        // 3) brakes, ABS keyed on the average forward slip
        for w in self.wheels.iter_mut() {
            w.apply_brake_torque(cmd.brake, average_forward_slip);
        }

        // 4) steering
        for w in self.wheels.iter_mut() {
            w.apply_steer(cmd.steer, speed);
        }

        // 5) handbrake
        if cmd.handbrake {
            for w in self.wheels.iter_mut() {
                w.apply_handbrake();
            }
        }

        // 6) slip angle + drift
        let slip_angle = slip_angle_deg(velocity, heading);
        let drifting = is_drifting(slip_angle);

        // 7) grip
        self.update_grip(slip_angle, cmd.handbrake);

        // 8) boost
        self.update_boost(cmd.boost, dt);

        // 9) outputs
        let boost_force = if self.state.boost_active {
            chassis_basis(heading).0 * self.config.boost_force
        } else {
            Vec3::zeros()
        };
        let wheels: [WheelForces; 4] = std::array::from_fn(|i| self.wheels[i].forces());

        // 10) publish
        let s = &mut self.state;
        s.position = if kin.position.iter().all(|v| v.is_finite()) { kin.position } else { s.position };
        s.velocity = velocity;
        s.heading = heading;
        s.speed = speed;
        s.slip_angle = slip_angle;
        s.drifting = drifting;

        VehicleForces { wheels, boost_force }
    }

    fn update_boost(&mut self, requested: bool, dt: f32) {
        let cfg = &self.config;
        let s = &mut self.state;

        if s.boost_active {
            s.boost_timer -= dt;
            if s.boost_timer <= 0.0 {
                s.boost_active = false;
                s.boost_timer = 0.0;
                s.boost_recharge_timer = cfg.boost_recharge;
            }
        } else if s.boost_recharge_timer > 0.0 {
            s.boost_recharge_timer = (s.boost_recharge_timer - dt).max(0.0);
        }

        if requested && !s.boost_active && s.boost_recharge_timer <= 0.0 && cfg.boost_duration > 0.0 {
            s.boost_active = true;
            s.boost_timer = cfg.boost_duration;
        }
    }
}
