// ==============================================================================
// simulation.rs — SIMULATION CONTEXT + FIXED TICK
// ==============================================================================
// Owns every (dynamics, controller) pair, the leader, the surface provider
// and the telemetry bus. No globals: whoever runs the loop owns this.
//
// tick(dt):
//   1) sense all chassis from the integrator
//   2) surface zone transitions (previous published position)
//   3) parallel: controller(previous published state, leader) -> Command
//               -> dynamics.step -> VehicleForces
//   4) integrator.apply for every vehicle, then integrator.step once
//   5) publish new states, queue + flush telemetry events
//
// Every vehicle reads in 3) before anything is published in 5).
// ==============================================================================

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::driver::AutonomousDriver;
use crate::dynamics::{VehicleDynamicsModel, VehicleState};
use crate::error::ConfigError;
use crate::surface::SurfaceGripProvider;
use crate::telemetry::{TelemetryBus, TelemetryFrame};
use crate::tire::{ChassisKinematics, Command, Vec3, VehicleForces};
use crate::vehicle::VehicleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleHandle(pub u32);

impl fmt::Display for VehicleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}", self.0)
    }
}

/// The physics collaborator. It owns rigid bodies; the dynamics model only
/// reads kinematics from it and hands it force parameters.
pub trait Integrator {
    fn insert_vehicle(&mut self, handle: VehicleHandle, config: &VehicleConfig, position: Vec3, heading: f32);
    fn remove_vehicle(&mut self, handle: VehicleHandle);
    /// None when `handle` has no body.
    fn sense(&self, handle: VehicleHandle) -> Option<ChassisKinematics>;
    fn apply(&mut self, handle: VehicleHandle, forces: &VehicleForces, dt: f32);
    fn step(&mut self, dt: f32);
}

/// Where a vehicle's Command comes from.
pub enum Controller {
    Autonomous(AutonomousDriver),
    /// Latest command from a human adapter; held until replaced.
    Human(Command),
}

impl Controller {
    fn command(&mut self, published: &VehicleState, leader: Option<Vec3>, dt: f32) -> Command {
        match self {
            Controller::Autonomous(driver) => driver.update(published, leader, dt),
            Controller::Human(cmd) => *cmd,
        }
    }
}

struct VehicleSlot {
    handle: VehicleHandle,
    dynamics: VehicleDynamicsModel,
    controller: Controller,
    published: VehicleState,
}

pub struct Simulation<I: Integrator> {
    integrator: I,
    vehicles: Vec<VehicleSlot>,
    leader: Option<VehicleHandle>,
    surfaces: SurfaceGripProvider,
    telemetry: TelemetryBus,
    tick: u64,
    next_id: u32,
}

impl<I: Integrator> Simulation<I> {
    pub fn new(integrator: I) -> Self {
        Self {
            integrator,
            vehicles: Vec::new(),
            leader: None,
            surfaces: SurfaceGripProvider::default(),
            telemetry: TelemetryBus::new(),
            tick: 0,
            next_id: 0,
        }
    }

    pub fn with_surfaces(mut self, surfaces: SurfaceGripProvider) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryBus {
        &mut self.telemetry
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn handles(&self) -> Vec<VehicleHandle> {
        self.vehicles.iter().map(|v| v.handle).collect()
    }

    fn slot(&self, handle: VehicleHandle) -> Option<&VehicleSlot> {
        self.vehicles.iter().find(|v| v.handle == handle)
    }

    fn slot_mut(&mut self, handle: VehicleHandle) -> Option<&mut VehicleSlot> {
        self.vehicles.iter_mut().find(|v| v.handle == handle)
    }

    /// Validates `config`, creates the dynamics model and the integrator body.
    pub fn add_vehicle(
        &mut self,
        config: Arc<VehicleConfig>,
        controller: Controller,
        position: Vec3,
        heading: f32,
    ) -> Result<VehicleHandle, ConfigError> {
        let mut dynamics = VehicleDynamicsModel::new(config.clone())?;
        dynamics.place(position, heading);

        let handle = VehicleHandle(self.next_id);
        self.next_id += 1;
        self.integrator.insert_vehicle(handle, &config, position, heading);

        let published = *dynamics.state();
        self.vehicles.push(VehicleSlot { handle, dynamics, controller, published });
        debug!(%handle, vehicle = %config.name, "vehicle added");
        Ok(handle)
    }

    /// Drops the pair and its body. Clears the leader if it was this vehicle.
    pub fn remove_vehicle(&mut self, handle: VehicleHandle) -> bool {
        let Some(i) = self.vehicles.iter().position(|v| v.handle == handle) else {
            return false;
        };
        self.vehicles.remove(i);
        self.integrator.remove_vehicle(handle);
        self.surfaces.forget(handle);
        if self.leader == Some(handle) {
            self.leader = None;
        }
        debug!(%handle, "vehicle removed");
        true
    }

    pub fn leader(&self) -> Option<VehicleHandle> {
        self.leader
    }

    /// Unknown handles clear the leader.
    pub fn set_leader(&mut self, handle: Option<VehicleHandle>) {
        self.leader = handle.filter(|h| self.slot(*h).is_some());
        info!(leader = ?self.leader, "leader set");
    }

    /// Returns false when `handle` is not human-controlled.
    pub fn set_human_command(&mut self, handle: VehicleHandle, command: Command) -> bool {
        match self.slot_mut(handle).map(|v| &mut v.controller) {
            Some(Controller::Human(cmd)) => {
                *cmd = command.sanitized();
                true
            }
            _ => false,
        }
    }

    pub fn driver(&self, handle: VehicleHandle) -> Option<&AutonomousDriver> {
        match &self.slot(handle)?.controller {
            Controller::Autonomous(d) => Some(d),
            Controller::Human(_) => None,
        }
    }

    pub fn start(&mut self, handle: VehicleHandle) -> bool {
        match self.slot_mut(handle).map(|v| &mut v.controller) {
            Some(Controller::Autonomous(d)) => d.start(),
            _ => false,
        }
    }

    pub fn stop(&mut self, handle: VehicleHandle) -> bool {
        match self.slot_mut(handle).map(|v| &mut v.controller) {
            Some(Controller::Autonomous(d)) => {
                d.stop();
                true
            }
            _ => false,
        }
    }

    /// Starts every Idle driver; returns how many started.
    pub fn start_all(&mut self) -> usize {
        self.vehicles
            .iter_mut()
            .filter_map(|v| match &mut v.controller {
                Controller::Autonomous(d) => Some(d.start()),
                Controller::Human(_) => None,
            })
            .filter(|started| *started)
            .count()
    }

    /// Last published state.
    pub fn state(&self, handle: VehicleHandle) -> Option<&VehicleState> {
        self.slot(handle).map(|v| &v.published)
    }

    pub fn dynamics(&self, handle: VehicleHandle) -> Option<&VehicleDynamicsModel> {
        self.slot(handle).map(|v| &v.dynamics)
    }

    pub fn frames(&self) -> Vec<TelemetryFrame> {
        self.vehicles
            .iter()
            .map(|v| TelemetryFrame {
                handle: v.handle,
                speed: v.published.speed,
                slip_angle: v.published.slip_angle,
                drifting: v.published.drifting,
                boost_active: v.published.boost_active,
                boost_charge: v.dynamics.boost_charge_fraction(),
            })
            .collect()
    }

    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        // 1) sense
        let sensed: Vec<Option<ChassisKinematics>> =
            self.vehicles.iter().map(|v| self.integrator.sense(v.handle)).collect();

        // 2) surfaces
        for v in self.vehicles.iter_mut() {
            if let Some(grip) = self.surfaces.update(v.handle, v.published.position) {
                v.dynamics.set_surface_grip(grip);
            }
        }

        // 3) controllers + dynamics, in parallel, reading only previous states
        let leader = self.leader;
        let leader_position = leader.and_then(|h| self.slot(h)).map(|v| v.published.position);
        let forces: Vec<Option<VehicleForces>> = self
            .vehicles
            .par_iter_mut()
            .zip(sensed.par_iter())
            .map(|(v, kin)| {
                let kin = (*kin)?;
                let leader_position = if leader == Some(v.handle) { None } else { leader_position };
                let command = v.controller.command(&v.published, leader_position, dt);
                Some(v.dynamics.step(&command, &kin, dt))
            })
            .collect();

        // 4) integrate
        for (v, f) in self.vehicles.iter().zip(forces.iter()) {
            if let Some(f) = f {
                self.integrator.apply(v.handle, f, dt);
            }
        }
        self.integrator.step(dt);

        // 5) publish
        for v in self.vehicles.iter_mut() {
            let next = *v.dynamics.state();
            self.telemetry.observe(v.handle, &v.published, &next);
            v.published = next;
        }
        self.tick += 1;
        self.telemetry.flush();
    }
}
