use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, info, warn};

use race_physics::config;
use race_physics::driver::{DriverConfig, RubberBand};
use race_physics::net::start_websocket_server;
use race_physics::physics::PhysicsWorld;
use race_physics::simulation::Simulation;
use race_physics::spawn::SpawnCoordinator;
use race_physics::state::SharedGameState;
use race_physics::track::{demo_circuit, demo_surfaces};
use race_physics::vehicle::{load_vehicle_configs, presets, VehicleConfig};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Asset file when configured and valid, built-in presets otherwise.
fn vehicle_configs() -> Vec<Arc<VehicleConfig>> {
    let Some(path) = config::vehicle_assets() else {
        return presets();
    };
    match load_vehicle_configs(&path) {
        Ok(configs) if !configs.is_empty() => configs,
        Ok(_) => {
            warn!(path = %path.display(), "vehicle asset file is empty, using built-in presets");
            presets()
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "vehicle assets rejected, using built-in presets");
            presets()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();
    info!("starting race physics server");

    let configs = vehicle_configs();
    let human_config = configs.first().cloned().context("no vehicle configurations available")?;
    let track = demo_circuit();

    let mut sim = Simulation::new(PhysicsWorld::new()).with_surfaces(demo_surfaces());

    let driver = DriverConfig {
        rubber_band: RubberBand { enabled: true, range: config::rubber_band_range() },
        ..DriverConfig::default()
    };
    let mut spawner = match config::spawn_seed() {
        Some(seed) => SpawnCoordinator::seeded(driver, seed),
        None => SpawnCoordinator::new(driver),
    };
    let grid = spawner
        .spawn_vehicles(&mut sim, track.clone(), config::ai_count(), &configs)
        .context("spawning the AI grid")?;
    let started = sim.start_all();
    info!(ai = grid.len(), started, "race started");

    let state = Arc::new(Mutex::new(SharedGameState::new(sim, human_config, track)));

    let port = config::server_port();
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding websocket port {port}"))?;
    tokio::spawn(start_websocket_server(listener, Arc::clone(&state)));

    // Fixed timestep
    let dt = config::tick_dt();
    let mut ticker = interval(config::tick_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut game = state.lock().await;
                game.sim.tick(dt);
                game.broadcast_snapshot();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
