// src/physics.rs

use std::collections::HashMap;

use nalgebra::UnitQuaternion;
use rapier3d::prelude::*;
use tracing::{debug, warn};

use crate::simulation::{Integrator, VehicleHandle};
use crate::tire::kinematics::{heading_of, slip_ratios, wheel_basis};
use crate::tire::{ChassisKinematics, VehicleForces, WheelContact, WheelId};
use crate::vehicle::VehicleConfig;

const GROUP_GROUND: Group  = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

const G: f32 = 9.81;
const WHEEL_INERTIA: f32 = 1.2;        // kg m^2
const SPIN_RELAXATION: f32 = 0.5;      // fraction toward free rolling per tick
const FORWARD_SLIP_PEAK: f32 = 0.1;    // slip ratio at full longitudinal force
const LATERAL_SLIP_PEAK: f32 = 0.15;   // slip ratio at full lateral force
const LATERAL_FADE_SPEED: f32 = 2.0;   // m/s below which lateral force fades out
const WORLD_LIMIT: f32 = 1_000.0;

/// One chassis body plus the wheel state the rigid body itself doesn't carry.
struct ChassisBody {
    body: RigidBodyHandle,
    mass: f32,
    downforce: f32,
    wheel_radius: f32,
    wheel_points: [Point<Real>; 4], // chassis local, contact height
    spin: [f32; 4],                 // rad/s
    steer: [f32; 4],                // deg, last applied
    spawn: Vector<Real>,
    spawn_heading: f32,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>, // gravity vector
    pub pipeline: PhysicsPipeline, // physics pipeline
    pub island_manager: IslandManager, // manages islands of bodies
    pub broad_phase: DefaultBroadPhase, // broad-phase collision detection
    pub narrow_phase: NarrowPhase, // collision detection
    pub bodies: RigidBodySet, // for rigid bodies
    pub colliders: ColliderSet, // for collision shapes
    pub joints: ImpulseJointSet, // for constraints
    pub multibody_joints: MultibodyJointSet,// for articulated bodies
    pub ccd: CCDSolver, // continuous collision detection
    pub query_pipeline: QueryPipeline, // for raycasting
    vehicles: HashMap<VehicleHandle, ChassisBody>, // handle -> chassis
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -G, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // === Big static ground box, top surface exactly at y = 0 ===
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();

        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();

        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        debug!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicles: HashMap::new(),
        }
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Wheel spin in rad/s, FL FR RL RR.
    pub fn wheel_spin(&self, handle: VehicleHandle) -> Option<[f32; 4]> {
        self.vehicles.get(&handle).map(|c| c.spin)
    }

    // --------------------------------------------------
    // Safety: reset bodies that left the world or went NaN
    // --------------------------------------------------
    fn reset_runaway_bodies(&mut self) {
        for (handle, car) in self.vehicles.iter_mut() {
            let Some(body) = self.bodies.get_mut(car.body) else { continue };
            let pos = *body.translation();

            let bad = pos.iter().any(|c| !c.is_finite() || c.abs() > WORLD_LIMIT)
                || body.linvel().iter().any(|c| !c.is_finite());

            if bad {
                body.set_translation(car.spawn, true);
                body.set_rotation(UnitQuaternion::new(vector![0.0, car.spawn_heading, 0.0]), true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                car.spin = [0.0; 4];
                warn!(%handle, x = car.spawn.x, z = car.spawn.z, "reset runaway body to its spawn point");
            }
        }
    }
}

#[inline]
fn body_heading(body: &RigidBody) -> f32 {
    let forward = body.rotation() * vector![0.0, 0.0, 1.0];
    heading_of(forward).unwrap_or(0.0)
}

impl Integrator for PhysicsWorld {
    /// Dynamic box chassis that may only yaw. Friction on the box itself is
    /// zero: all grip comes from the tire impulses in `apply`.
    fn insert_vehicle(&mut self, handle: VehicleHandle, config: &VehicleConfig, position: Vector<Real>, heading: f32) {
        let [hx, hy, hz] = config.chassis_half_extents;
        let [cx, cy, cz] = config.center_of_mass_offset;
        let volume = 8.0 * hx * hy * hz;
        let density = config.mass / volume; // rho = m / V

        // collider bottom rests just above the ground
        let spawn = vector![position.x, position.y + hy - cy + 0.02, position.z];

        let rb = RigidBodyBuilder::dynamic()
            .translation(spawn)
            .rotation(vector![0.0, heading, 0.0])
            .linear_damping(config.linear_drag)
            .angular_damping(config.angular_drag)
            .enabled_rotations(false, true, false)
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz]) // COM offset
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_CHASSIS))
            .active_events(ActiveEvents::empty())
            .density(density)
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(0.0)
            .build();

        let body = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        // FL, FR, RL, RR; chassis right is -X, so left wheels sit at +X
        let (half_track, half_base, ground) = (config.track_width * 0.5, config.wheelbase * 0.5, cy - hy);
        let wheel_points = WheelId::ALL.map(|id| {
            let x = if id.is_left() { half_track } else { -half_track };
            let z = if id.is_front() { half_base } else { -half_base };
            point![x, ground, z]
        });

        self.vehicles.insert(
            handle,
            ChassisBody {
                body,
                mass: config.mass,
                downforce: config.downforce,
                wheel_radius: config.wheel_radius,
                wheel_points,
                spin: [0.0; 4],
                steer: [0.0; 4],
                spawn,
                spawn_heading: heading,
            },
        );

        debug!(%handle, vehicle = %config.name, ?body, "chassis body inserted");
    }

    fn remove_vehicle(&mut self, handle: VehicleHandle) {
        let Some(car) = self.vehicles.remove(&handle) else { return };
        self.bodies.remove(
            car.body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn sense(&self, handle: VehicleHandle) -> Option<ChassisKinematics> {
        let car = self.vehicles.get(&handle)?;
        let body = self.bodies.get(car.body)?;
        let iso = body.position();
        let heading = body_heading(body);

        // measured in each wheel's frame as last steered
        let wheels = std::array::from_fn(|i| {
            let point = iso * car.wheel_points[i];
            let v = body.velocity_at_point(&point);
            let (fwd, right) = wheel_basis(heading, car.steer[i]);
            WheelContact {
                long_speed: v.dot(&fwd),
                lat_speed: v.dot(&right),
                surface_speed: car.spin[i] * car.wheel_radius,
            }
        });

        Some(ChassisKinematics {
            position: *body.translation(),
            velocity: *body.linvel(),
            heading,
            wheels,
        })
    }

    // --------------------------------------------------
    // Tire model: torque -> spin, slip x stiffness x load -> impulse
    // --------------------------------------------------
    fn apply(&mut self, handle: VehicleHandle, forces: &VehicleForces, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let Some(car) = self.vehicles.get_mut(&handle) else { return };
        let Some(body) = self.bodies.get_mut(car.body) else { return };

        let iso = *body.position();
        let heading = body_heading(body);
        let linvel = *body.linvel();
        let speed = vector![linvel.x, 0.0, linvel.z].norm();

        let load = car.mass * G * 0.25 + car.downforce * speed * speed * 0.25;
        let impulse_cap = car.mass * 0.25;
        let lateral_fade = (speed / LATERAL_FADE_SPEED).clamp(0.0, 1.0);

        for id in WheelId::ALL {
            let i = id.index();
            let wf = forces.wheel(id);
            car.steer[i] = if wf.steer_angle.is_finite() { wf.steer_angle } else { 0.0 };
            let point = iso * car.wheel_points[i];
            let v = body.velocity_at_point(&point);
            let (fwd, right) = wheel_basis(heading, car.steer[i]);
            let v_long = v.dot(&fwd);
            let v_lat = v.dot(&right);

            // spin: drive adds, brake pulls toward zero without crossing it
            let r = car.wheel_radius;
            let mut omega = car.spin[i] + wf.motor_torque / WHEEL_INERTIA * dt;
            let brake_dw = wf.brake_torque / WHEEL_INERTIA * dt;
            omega = if omega.abs() <= brake_dw { 0.0 } else { omega - brake_dw * omega.signum() };

            let contact = WheelContact { long_speed: v_long, lat_speed: v_lat, surface_speed: omega * r };
            let (slip, lat_slip) = slip_ratios(&contact);

            let fx = load * wf.forward_stiffness * (slip / FORWARD_SLIP_PEAK).clamp(-1.0, 1.0);
            let fy = -load * wf.lateral_stiffness * (lat_slip / LATERAL_SLIP_PEAK).clamp(-1.0, 1.0) * lateral_fade;

            let cap_x = impulse_cap * (omega * r - v_long).abs();
            let cap_y = impulse_cap * v_lat.abs();
            if !(cap_x.is_finite() && cap_y.is_finite() && fx.is_finite() && fy.is_finite()) {
                car.spin[i] = 0.0;
                continue;
            }
            let jx = (fx * dt).clamp(-cap_x, cap_x);
            let jy = (fy * dt).clamp(-cap_y, cap_y);

            body.apply_impulse_at_point(fwd * jx + right * jy, point, true);

            // ground reaction drags the wheel toward free rolling
            omega += (v_long / r - omega) * SPIN_RELAXATION;
            car.spin[i] = if omega.is_finite() { omega } else { 0.0 };
        }

        if forces.boost_force.iter().all(|c| c.is_finite()) && forces.boost_force.norm_squared() > 0.0 {
            body.apply_impulse(forces.boost_force * dt, true);
        }
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        self.reset_runaway_bodies();
    }
}
