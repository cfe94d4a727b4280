// ==============================================================================
// driver — AUTONOMOUS PATH-FOLLOWING DRIVER
// ==============================================================================
// Each tick while Chasing:
//   1) nearest waypoint (full scan), look-ahead target past the next waypoint
//   2) steering PID on the signed heading error (deg), / 45 deg, clamp [-1,1]
//   3) throttle PID on target_speed - speed, clamp [0,1]
//   4) target_speed = max_speed * rubber band * policy, capped by the corners
//      ahead: sqrt(lateral_accel * grip * radius), raised by the braking
//      room left before each corner
//   5) emit the Command
//
// Phases: Idle -> Chasing -> Stopped, switched by the owner.
// An empty path makes the driver inert for its whole life.
// ==============================================================================

pub mod path;
pub mod pid;
pub mod policy;
pub mod rubber_band;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dynamics::VehicleState;
use crate::tire::kinematics::signed_angle_deg;
use crate::tire::{Command, Vec3};

pub use path::PathSpec;
pub use pid::{PidController, PidGains};
pub use policy::{AdaptivePolicy, AdaptiveTuning, DrivingPolicy, PolicyKind, PolicyObservation, ScriptedPolicy};
pub use rubber_band::RubberBand;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub max_speed: f32,            // m/s
    pub steer_gains: PidGains,
    pub throttle_gains: PidGains,
    pub lookahead_distance: f32,   // m past the next waypoint
    pub steer_angle_scale: f32,    // deg of PID output that maps to full lock
    pub rubber_band: RubberBand,
    /// None = unbounded integrators.
    pub integral_limit: Option<f32>,
    /// Negative throttle-PID output becomes brake.
    pub brake_on_overspeed: bool,
    /// Accepted for tuning files; lane changes are not implemented.
    pub overtake_lane_offset: f32,
    pub policy: PolicyKind,
    /// Sideways acceleration the driver is willing to corner at, m/s^2.
    /// Zero turns the corner limit off.
    pub corner_lateral_accel: f32,
    /// Deceleration assumed when braking for a corner ahead, m/s^2.
    pub corner_brake_decel: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_speed: 30.0,
            steer_gains: PidGains { kp: 1.2, ki: 0.05, kd: 0.1 },
            throttle_gains: PidGains { kp: 0.5, ki: 0.05, kd: 0.0 },
            lookahead_distance: 6.0,
            steer_angle_scale: 45.0,
            rubber_band: RubberBand::default(),
            integral_limit: None,
            brake_on_overspeed: true,
            overtake_lane_offset: 0.0,
            policy: PolicyKind::Scripted,
            corner_lateral_accel: 5.0,
            corner_brake_decel: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverPhase {
    Idle,
    Chasing,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct DriverState {
    /// None while inert or before the first chasing tick.
    pub waypoint_index: Option<usize>,
    pub steer_pid: PidController,
    pub throttle_pid: PidController,
    pub target: Option<Vec3>,
    pub target_speed: f32,
}

pub struct AutonomousDriver {
    path: Arc<PathSpec>,
    config: DriverConfig,
    policy: Box<dyn DrivingPolicy>,
    phase: DriverPhase,
    state: DriverState,
    inert: bool,
}

impl AutonomousDriver {
    pub fn new(path: Arc<PathSpec>, config: DriverConfig, policy: Box<dyn DrivingPolicy>) -> Self {
        let inert = match path.validate() {
            Ok(()) => false,
            Err(e) => {
                warn!(error = %e, "autonomous driver has no usable path, driver is inert");
                true
            }
        };
        if config.overtake_lane_offset != 0.0 {
            warn!(
                offset = config.overtake_lane_offset,
                "overtake lane offset is configured but lane changes are not implemented"
            );
        }

        let state = DriverState {
            waypoint_index: None,
            steer_pid: PidController::new(config.steer_gains, config.integral_limit),
            throttle_pid: PidController::new(config.throttle_gains, config.integral_limit),
            target: None,
            target_speed: 0.0,
        };

        Self { path, config, policy, phase: DriverPhase::Idle, state, inert }
    }

    /// Driver with the policy named in `config`.
    pub fn from_config(path: Arc<PathSpec>, config: DriverConfig) -> Self {
        let policy = config.policy.build();
        Self::new(path, config, policy)
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Idle -> Chasing. Returns false from any other phase.
    pub fn start(&mut self) -> bool {
        if self.phase != DriverPhase::Idle {
            return false;
        }
        self.phase = DriverPhase::Chasing;
        true
    }

    /// Any phase -> Stopped. Controller memory is dropped with the chase.
    pub fn stop(&mut self) {
        self.state.steer_pid.reset();
        self.state.throttle_pid.reset();
        self.state.target = None;
        self.phase = DriverPhase::Stopped;
    }

    /// Target speed before the policy gets a say.
    pub fn rubber_banded_speed(&self, distance_to_leader: Option<f32>) -> f32 {
        self.config.max_speed * self.config.rubber_band.multiplier(distance_to_leader)
    }

    pub fn update(&mut self, vehicle: &VehicleState, leader: Option<Vec3>, dt: f32) -> Command {
        if self.inert {
            return Command::IDLE;
        }
        match self.phase {
            DriverPhase::Idle => Command::IDLE,
            DriverPhase::Stopped => Command { brake: 1.0, ..Command::IDLE },
            DriverPhase::Chasing => self.chase(vehicle, leader, dt),
        }
    }

    /// Fastest speed at `index` that still makes every corner within braking
    /// range. Infinite when nothing ahead needs slowing for.
    pub fn corner_speed_limit(&self, index: usize, top_speed: f32, grip: f32) -> f32 {
        let lateral = self.config.corner_lateral_accel * grip.clamp(0.0, 1.0);
        if !lateral.is_finite() || lateral <= 0.0 || self.path.is_empty() {
            return f32::INFINITY;
        }
        let decel = self.config.corner_brake_decel.max(0.0);
        let horizon = if decel > 0.0 { top_speed * top_speed / (2.0 * decel) } else { 0.0 };

        let mut limit = f32::INFINITY;
        let mut travelled = 0.0;
        let mut i = index;
        for _ in 0..self.path.len() {
            if let Some(radius) = self.path.turn_radius(i) {
                let corner = lateral * radius;
                limit = limit.min((corner + 2.0 * decel * travelled).sqrt());
            }
            travelled += self.path.segment_length(i);
            let next = self.path.next_index(i);
            if next == i || travelled > horizon {
                break;
            }
            i = next;
        }
        limit
    }

    fn chase(&mut self, vehicle: &VehicleState, leader: Option<Vec3>, dt: f32) -> Command {
        // 1) waypoint tracking
        let Some(index) = self.path.nearest_index(vehicle.position) else {
            return Command::IDLE;
        };
        let Some(target) = self.path.lookahead_target(index, self.config.lookahead_distance) else {
            return Command::IDLE;
        };
        self.state.waypoint_index = Some(index);
        self.state.target = Some(target);

        // 2) steering
        let heading_error = signed_angle_deg(vehicle.heading, target - vehicle.position);
        let steer_out = self.state.steer_pid.update(heading_error, dt);
        let steer = if self.config.steer_angle_scale > 0.0 {
            (steer_out / self.config.steer_angle_scale).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        // 4) rubber band + policy
        let distance = leader.map(|p| {
            let d = p - vehicle.position;
            (d.x * d.x + d.z * d.z).sqrt()
        });
        let base = self.rubber_banded_speed(distance);
        let obs = PolicyObservation { heading_error_deg: heading_error, speed: vehicle.speed, dt };
        let target_speed = self
            .policy
            .target_speed(base, &obs)
            .min(self.corner_speed_limit(index, base, vehicle.surface_grip));
        self.state.target_speed = target_speed;

        // 3) throttle
        let throttle_out = self.state.throttle_pid.update(target_speed - vehicle.speed, dt);
        let throttle = throttle_out.clamp(0.0, 1.0);
        let brake = if self.config.brake_on_overspeed && throttle_out < 0.0 {
            (-throttle_out).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Command { throttle, brake, steer, handbrake: false, boost: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight() -> Arc<PathSpec> {
        Arc::new(PathSpec::new(
            (0..10).map(|i| Vec3::new(0.0, 0.0, i as f32 * 10.0)).collect(),
            false,
        ))
    }

    fn chasing(path: Arc<PathSpec>, config: DriverConfig) -> AutonomousDriver {
        let mut d = AutonomousDriver::from_config(path, config);
        assert!(d.start());
        d
    }

    #[test]
    fn empty_path_is_a_permanent_no_op() {
        let mut d = AutonomousDriver::from_config(Arc::new(PathSpec::default()), DriverConfig::default());
        assert!(d.is_inert());
        d.start();
        for _ in 0..10 {
            let cmd = d.update(&VehicleState::default(), Some(Vec3::new(5.0, 0.0, 5.0)), 0.016);
            assert_eq!((cmd.throttle, cmd.brake, cmd.steer), (0.0, 0.0, 0.0));
        }
        assert_eq!(d.state().waypoint_index, None);
    }

    #[test]
    fn phases_follow_idle_chasing_stopped() {
        let mut d = AutonomousDriver::from_config(straight(), DriverConfig::default());
        assert_eq!(d.phase(), DriverPhase::Idle);
        assert_eq!(d.update(&VehicleState::default(), None, 0.016), Command::IDLE);

        assert!(d.start());
        assert!(!d.start());
        assert!(d.update(&VehicleState::default(), None, 0.016).throttle > 0.0);

        d.stop();
        assert!(!d.start());
        let cmd = d.update(&VehicleState::default(), None, 0.016);
        assert_eq!(cmd.throttle, 0.0);
        assert_eq!(cmd.brake, 1.0);
    }

    #[test]
    fn stop_clears_controller_memory() {
        let mut d = chasing(straight(), DriverConfig::default());
        let vehicle = VehicleState { position: Vec3::new(8.0, 0.0, 0.0), ..VehicleState::default() };
        for _ in 0..5 {
            d.update(&vehicle, None, 0.016);
        }
        assert!(d.state().steer_pid.integral().abs() > 0.0);
        assert!(d.state().target.is_some());

        d.stop();
        assert_eq!(d.state().steer_pid.integral(), 0.0);
        assert_eq!(d.state().throttle_pid.integral(), 0.0);
        assert!(d.state().target.is_none());
    }

    #[test]
    fn on_the_line_drives_straight() {
        let mut d = chasing(straight(), DriverConfig::default());
        let cmd = d.update(&VehicleState::default(), None, 0.016);
        assert!(cmd.steer.abs() < 1e-4);
        assert!(cmd.throttle > 0.0);
        assert_eq!(d.state().waypoint_index, Some(0));
    }

    #[test]
    fn steers_toward_a_target_on_the_right() {
        let mut d = chasing(straight(), DriverConfig::default());
        // path lies along x = 0; vehicle sits at +X (left of it) facing +Z
        let vehicle = VehicleState { position: Vec3::new(8.0, 0.0, 0.0), ..VehicleState::default() };
        let cmd = d.update(&vehicle, None, 0.016);
        assert!(cmd.steer > 0.0);
        assert!(cmd.steer <= 1.0);
    }

    #[test]
    fn steer_output_is_clamped() {
        let mut d = chasing(straight(), DriverConfig::default());
        // facing -Z, target behind
        let vehicle = VehicleState { heading: std::f32::consts::PI, ..VehicleState::default() };
        let cmd = d.update(&vehicle, None, 0.016);
        assert_eq!(cmd.steer.abs(), 1.0);
    }

    #[test]
    fn rubber_band_scales_target_speed() {
        let config = DriverConfig {
            max_speed: 30.0,
            rubber_band: RubberBand { enabled: true, range: 40.0 },
            ..DriverConfig::default()
        };
        let mut d = chasing(straight(), config);
        let vehicle = VehicleState::default();

        d.update(&vehicle, Some(Vec3::zeros()), 0.016);
        assert!((d.state().target_speed - 27.0).abs() < 1e-4);

        d.update(&vehicle, Some(Vec3::new(0.0, 0.0, 400.0)), 0.016);
        assert!((d.state().target_speed - 33.0).abs() < 1e-4);

        d.update(&vehicle, None, 0.016);
        assert!((d.state().target_speed - 30.0).abs() < 1e-4);
    }

    #[test]
    fn overspeed_brakes() {
        let mut d = chasing(straight(), DriverConfig { max_speed: 10.0, ..DriverConfig::default() });
        let vehicle = VehicleState { speed: 25.0, ..VehicleState::default() };
        let cmd = d.update(&vehicle, None, 0.016);
        assert_eq!(cmd.throttle, 0.0);
        assert!(cmd.brake > 0.0);
    }

    #[test]
    fn corners_cap_target_speed() {
        // ends of this oval have a radius of about 41 m
        let path = Arc::new(PathSpec::oval(Vec3::zeros(), 120.0, 70.0, 48));
        let config = DriverConfig { max_speed: 50.0, ..DriverConfig::default() };
        let mut d = chasing(path.clone(), config);

        let on_end = VehicleState { position: path.waypoints()[0], ..VehicleState::default() };
        d.update(&on_end, None, 0.016);
        let end_speed = d.state().target_speed;
        let r = path.turn_radius(0).unwrap();
        assert!((end_speed - (5.0 * r).sqrt()).abs() < 1e-3, "{end_speed}");

        // mid-side: more room, but still braking for the next end
        let on_side = VehicleState { position: path.waypoints()[12], ..VehicleState::default() };
        d.update(&on_side, None, 0.016);
        let side_speed = d.state().target_speed;
        assert!(side_speed > end_speed);
        assert!(side_speed < 50.0);

        // less grip, slower corners
        let on_ice = VehicleState { surface_grip: 0.35, ..on_end };
        d.update(&on_ice, None, 0.016);
        assert!(d.state().target_speed < end_speed);
    }

    #[test]
    fn corner_limit_off_when_lateral_accel_is_zero() {
        let path = Arc::new(PathSpec::oval(Vec3::zeros(), 20.0, 10.0, 16));
        let config = DriverConfig { corner_lateral_accel: 0.0, ..DriverConfig::default() };
        let d = AutonomousDriver::from_config(path, config);
        assert_eq!(d.corner_speed_limit(0, 30.0, 1.0), f32::INFINITY);
    }

    #[test]
    fn nearest_index_wraps_on_closed_loop() {
        let path = Arc::new(PathSpec::oval(Vec3::zeros(), 50.0, 30.0, 16));
        let mut d = chasing(path.clone(), DriverConfig::default());
        let last = path.waypoints()[15];
        let vehicle = VehicleState { position: last, ..VehicleState::default() };
        d.update(&vehicle, None, 0.016);
        assert_eq!(d.state().waypoint_index, Some(15));
        let target = d.state().target.unwrap();
        // look-ahead sits past waypoint 0, not past the end of the list
        assert!((target - path.waypoints()[0]).norm() <= DriverConfig::default().lookahead_distance + 1e-3);
    }
}
