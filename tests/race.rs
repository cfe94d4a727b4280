use std::collections::HashSet;
use std::sync::Arc;

use race_physics::driver::{DriverConfig, DriverPhase, PathSpec};
use race_physics::physics::PhysicsWorld;
use race_physics::simulation::Simulation;
use race_physics::spawn::SpawnCoordinator;
use race_physics::telemetry::TelemetryEvent;
use race_physics::tire::Vec3;
use race_physics::track::{demo_circuit, demo_surfaces};
use race_physics::vehicle::presets;

const DT: f32 = 1.0 / 60.0;

fn oval() -> Arc<PathSpec> {
    Arc::new(PathSpec::oval(Vec3::zeros(), 80.0, 50.0, 32))
}

#[test]
fn ai_grid_drives_on_the_rapier_world() {
    let mut sim = Simulation::new(PhysicsWorld::new());
    let mut spawner = SpawnCoordinator::seeded(DriverConfig::default(), 11);
    let grid = spawner.spawn_vehicles(&mut sim, oval(), 3, &presets()).unwrap();
    let start: Vec<Vec3> = grid.iter().map(|h| sim.state(*h).unwrap().position).collect();

    assert_eq!(sim.start_all(), 3);
    for _ in 0..180 {
        sim.tick(DT);
    }

    for (h, from) in grid.iter().zip(start) {
        let s = sim.state(*h).unwrap();
        assert!(s.position.iter().all(|c| c.is_finite()), "{h}: {:?}", s.position);
        assert!(s.velocity.iter().all(|c| c.is_finite()));
        assert!(s.heading.is_finite() && s.slip_angle.is_finite());

        let moved = Vec3::new(s.position.x - from.x, 0.0, s.position.z - from.z).norm();
        assert!(moved > 1.0, "{h} moved only {moved} m");

        let driver = sim.driver(*h).unwrap();
        assert_eq!(driver.phase(), DriverPhase::Chasing);
        assert!(driver.state().waypoint_index.is_some());
    }
}

fn off_line(path: &PathSpec, p: Vec3) -> f32 {
    let i = path.nearest_index(p).unwrap();
    let w = path.waypoints()[i];
    Vec3::new(p.x - w.x, 0.0, p.z - w.z).norm()
}

#[test]
fn ai_grid_stays_on_the_demo_circuit() {
    let track = demo_circuit();
    let mut sim = Simulation::new(PhysicsWorld::new()).with_surfaces(demo_surfaces());
    let mut spawner = SpawnCoordinator::seeded(DriverConfig::default(), 21);
    let grid = spawner.spawn_vehicles(&mut sim, track.clone(), 4, &presets()).unwrap();
    sim.start_all();

    let mut worst = vec![0.0f32; grid.len()];
    let mut visited: Vec<HashSet<usize>> = vec![HashSet::new(); grid.len()];

    // 30 s of racing
    for _ in 0..1800 {
        sim.tick(DT);
        for (k, h) in grid.iter().enumerate() {
            let p = sim.state(*h).unwrap().position;
            worst[k] = worst[k].max(off_line(&track, p));
            if let Some(i) = sim.driver(*h).unwrap().state().waypoint_index {
                visited[k].insert(i);
            }
        }
    }

    for (k, h) in grid.iter().enumerate() {
        assert!(worst[k] < 25.0, "{h} ran {} m off the racing line", worst[k]);
        assert!(visited[k].len() >= 12, "{h} only passed {} waypoints", visited[k].len());
    }
}

#[test]
fn stopping_the_race_brings_cars_down() {
    let mut sim = Simulation::new(PhysicsWorld::new());
    let mut spawner = SpawnCoordinator::seeded(DriverConfig::default(), 3);
    let grid = spawner.spawn_vehicles(&mut sim, oval(), 2, &presets()).unwrap();
    sim.start_all();
    for _ in 0..120 {
        sim.tick(DT);
    }
    let fast: Vec<f32> = grid.iter().map(|h| sim.state(*h).unwrap().speed).collect();

    for h in &grid {
        assert!(sim.stop(*h));
    }
    for _ in 0..240 {
        sim.tick(DT);
    }
    for (h, before) in grid.iter().zip(fast) {
        let after = sim.state(*h).unwrap().speed;
        assert!(after < before, "{h}: {before} -> {after}");
    }
}

#[test]
fn removed_vehicles_leave_the_world() {
    let mut sim = Simulation::new(PhysicsWorld::new());
    let mut spawner = SpawnCoordinator::seeded(DriverConfig::default(), 5);
    let grid = spawner.spawn_vehicles(&mut sim, oval(), 2, &presets()).unwrap();
    sim.set_leader(Some(grid[0]));
    let (_, mut events) = sim.telemetry_mut().subscribe();

    assert!(sim.remove_vehicle(grid[0]));
    assert_eq!(sim.leader(), None);
    assert_eq!(sim.integrator().vehicle_count(), 1);

    sim.start_all();
    for _ in 0..30 {
        sim.tick(DT);
    }
    // nothing is ever reported for the removed vehicle
    while let Ok(event) = events.try_recv() {
        let handle = match event {
            TelemetryEvent::DriftStarted(h)
            | TelemetryEvent::DriftEnded(h)
            | TelemetryEvent::BoostActivated(h)
            | TelemetryEvent::BoostDepleted(h) => h,
        };
        assert_ne!(handle, grid[0]);
    }
}
