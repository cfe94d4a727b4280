//! Track surface zones.
//!
//! Axis-aligned rectangles on the ground plane, each with a grip multiplier.
//! The provider remembers which zone each vehicle was last in and reports a
//! value only on enter (the zone's grip) or exit (1.0).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::simulation::VehicleHandle;
use crate::tire::{clamp_grip, Vec3};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceZone {
    pub name: String,
    /// [x, z] corner with the smaller coordinates.
    pub min: [f32; 2],
    pub max: [f32; 2],
    pub grip: f32,
}

impl SurfaceZone {
    pub fn new(name: impl Into<String>, min: [f32; 2], max: [f32; 2], grip: f32) -> Self {
        Self { name: name.into(), min, max, grip: clamp_grip(grip) }
    }

    pub fn contains(&self, position: Vec3) -> bool {
        position.x >= self.min[0]
            && position.x <= self.max[0]
            && position.z >= self.min[1]
            && position.z <= self.max[1]
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceGripProvider {
    zones: Vec<SurfaceZone>,
    occupancy: HashMap<VehicleHandle, Option<usize>>,
}

impl SurfaceGripProvider {
    pub fn new(zones: Vec<SurfaceZone>) -> Self {
        Self { zones, occupancy: HashMap::new() }
    }

    /// First zone (in insertion order) containing `position`.
    pub fn zone_at(&self, position: Vec3) -> Option<usize> {
        self.zones.iter().position(|z| z.contains(position))
    }

    /// New grip for `handle` if it changed zone since the last call, else None.
    /// A vehicle seen for the first time outside every zone reports nothing.
    pub fn update(&mut self, handle: VehicleHandle, position: Vec3) -> Option<f32> {
        let now = self.zone_at(position);
        let before = self.occupancy.insert(handle, now).flatten();
        if now == before {
            return None;
        }
        Some(match now {
            Some(i) => self.zones[i].grip,
            None => 1.0,
        })
    }

    pub fn forget(&mut self, handle: VehicleHandle) {
        self.occupancy.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SurfaceGripProvider {
        SurfaceGripProvider::new(vec![
            SurfaceZone::new("ice", [0.0, 0.0], [10.0, 10.0], 0.3),
            SurfaceZone::new("gravel", [5.0, 5.0], [20.0, 20.0], 0.6),
        ])
    }

    #[test]
    fn enter_then_exit() {
        let mut p = provider();
        let car = VehicleHandle(1);
        assert_eq!(p.update(car, Vec3::new(-5.0, 0.0, -5.0)), None);
        assert_eq!(p.update(car, Vec3::new(2.0, 0.0, 2.0)), Some(0.3));
        assert_eq!(p.update(car, Vec3::new(3.0, 0.0, 3.0)), None);
        assert_eq!(p.update(car, Vec3::new(-1.0, 0.0, 3.0)), Some(1.0));
    }

    #[test]
    fn overlap_prefers_first_zone_and_moves_between_zones() {
        let mut p = provider();
        let car = VehicleHandle(7);
        assert_eq!(p.update(car, Vec3::new(6.0, 0.0, 6.0)), Some(0.3));
        assert_eq!(p.update(car, Vec3::new(15.0, 0.0, 15.0)), Some(0.6));
    }

    #[test]
    fn vehicles_are_tracked_independently() {
        let mut p = provider();
        assert_eq!(p.update(VehicleHandle(1), Vec3::new(1.0, 0.0, 1.0)), Some(0.3));
        assert_eq!(p.update(VehicleHandle(2), Vec3::new(1.0, 0.0, 1.0)), Some(0.3));
        p.forget(VehicleHandle(1));
        assert_eq!(p.update(VehicleHandle(1), Vec3::new(1.0, 0.0, 1.0)), Some(0.3));
    }

    #[test]
    fn zone_grip_is_clamped() {
        assert_eq!(SurfaceZone::new("boost pad", [0.0, 0.0], [1.0, 1.0], 9.0).grip, 2.0);
    }
}
