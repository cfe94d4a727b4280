use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::driver::{AutonomousDriver, DriverConfig, PathSpec};
use crate::error::SpawnError;
use crate::simulation::{Controller, Integrator, Simulation, VehicleHandle};
use crate::tire::kinematics::{chassis_basis, heading_of};
use crate::tire::Vec3;
use crate::vehicle::VehicleConfig;

// ---------------------------------------------
// SPAWN COORDINATOR FOR AI GRIDS
// ---------------------------------------------
#[derive(Debug)]
pub struct SpawnCoordinator {
    /// Arc length between consecutive grid slots, meters.
    pub spacing: f32,
    /// Sideways offset from the path line; even slots go left, odd go right.
    pub lane_offset: f32,
    /// Driver skill range; each driver's max speed is the vehicle's
    /// `max_speed` scaled by a draw from here.
    pub skill_min: f32,
    pub skill_max: f32,
    pub driver: DriverConfig,
    rng: StdRng,
}

impl SpawnCoordinator {
    pub fn new(driver: DriverConfig) -> Self {
        Self::with_rng(driver, StdRng::from_entropy())
    }

    pub fn seeded(driver: DriverConfig, seed: u64) -> Self {
        Self::with_rng(driver, StdRng::seed_from_u64(seed))
    }

    fn with_rng(driver: DriverConfig, rng: StdRng) -> Self {
        Self {
            spacing: 8.0,
            lane_offset: 2.0,
            skill_min: 0.85,
            skill_max: 1.0,
            driver,
            rng,
        }
    }

    fn draw_skill(&mut self) -> f32 {
        let (lo, hi) = (self.skill_min.min(self.skill_max), self.skill_min.max(self.skill_max));
        if hi - lo <= f32::EPSILON {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    // ---------------------------------------------------------
    // Place `count` AI vehicles along `path` and pair each with a
    // fresh Idle driver. Nothing is spawned if any config is bad.
    // ---------------------------------------------------------
    pub fn spawn_vehicles<I: Integrator>(
        &mut self,
        sim: &mut Simulation<I>,
        path: Arc<PathSpec>,
        count: usize,
        configs: &[Arc<VehicleConfig>],
    ) -> Result<Vec<VehicleHandle>, SpawnError> {
        if configs.is_empty() {
            return Err(SpawnError::NoConfigs);
        }
        for config in configs {
            config.validate()?;
        }

        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let config = configs[i % configs.len()].clone();

            let (position, heading) = match path.sample(i as f32 * self.spacing) {
                Some((point, dir)) => {
                    let heading = heading_of(dir).unwrap_or(0.0);
                    let (_, right) = chassis_basis(heading);
                    let side = if i % 2 == 0 { -1.0 } else { 1.0 };
                    (point + right * (side * self.lane_offset), heading)
                }
                // empty path: line the grid up on the origin, drivers stay inert
                None => (Vec3::new(0.0, 0.0, -(i as f32) * self.spacing), 0.0),
            };

            let skill = self.draw_skill();
            let driver_config = DriverConfig { max_speed: config.max_speed * skill, ..self.driver };
            let driver = AutonomousDriver::from_config(path.clone(), driver_config);
            let policy = driver.policy_name();

            let handle = sim.add_vehicle(config.clone(), Controller::Autonomous(driver), position, heading)?;
            info!(
                %handle,
                vehicle = %config.name,
                slot = i,
                skill,
                policy,
                x = position.x,
                z = position.z,
                "spawned AI vehicle"
            );
            handles.push(handle);
        }
        Ok(handles)
    }
}
