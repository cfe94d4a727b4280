//! Per-wheel arcade vehicle dynamics, an autonomous path-following driver,
//! and the fixed-step simulation server around them.

pub mod config;
pub mod driver;
pub mod dynamics;
pub mod error;
pub mod net;
pub mod physics;
pub mod simulation;
pub mod spawn;
pub mod state;
pub mod surface;
pub mod telemetry;
pub mod tire;
pub mod track;
pub mod vehicle;

pub use driver::{AutonomousDriver, DriverConfig, DriverPhase, PathSpec};
pub use dynamics::{VehicleDynamicsModel, VehicleState};
pub use error::{ConfigError, PathError, SpawnError};
pub use physics::PhysicsWorld;
pub use simulation::{Controller, Integrator, Simulation, VehicleHandle};
pub use spawn::SpawnCoordinator;
pub use tire::Command;
pub use vehicle::VehicleConfig;
