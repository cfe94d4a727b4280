//! tire - engine-agnostic per-wheel force helpers (pure functions + the
//! stateful `WheelForceModel` that wraps them).

pub mod types;
pub mod curve;
pub mod state;
pub mod kinematics;
pub mod longitudinal;
pub mod steering;
pub mod friction;
pub mod wheel;

pub use types::*;
pub use curve::Curve;
pub use state::WheelState;
pub use wheel::WheelForceModel;
