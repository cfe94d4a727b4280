use std::sync::Arc;

use crate::driver::PathSpec;
use crate::surface::{SurfaceGripProvider, SurfaceZone};
use crate::tire::Vec3;

// Oval demo circuit: 240 x 140 m, 48 waypoints, counter-clockwise. A gravel
// trap sits past the +X hairpin and an ice patch on the -Z side.

pub fn demo_circuit() -> Arc<PathSpec> {
    Arc::new(PathSpec::oval(Vec3::zeros(), 120.0, 70.0, 48))
}

pub fn demo_surfaces() -> SurfaceGripProvider {
    SurfaceGripProvider::new(vec![
        SurfaceZone::new("gravel", [125.0, -30.0], [150.0, 30.0], 0.6),
        SurfaceZone::new("ice", [-40.0, -78.0], [0.0, -62.0], 0.35),
    ])
}
