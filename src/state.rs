use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use crate::driver::PathSpec;
use crate::error::ConfigError;
use crate::physics::PhysicsWorld;
use crate::simulation::{Controller, Simulation, VehicleHandle};
use crate::telemetry::{TelemetryEvent, TelemetryFrame};
use crate::tire::kinematics::heading_of;
use crate::tire::{Command, Vec3};
use crate::vehicle::VehicleConfig;

/// Meters between human grid slots, counted backwards from the start line.
const HUMAN_GRID_SPACING: f32 = 10.0;

#[derive(Serialize)]
pub struct VehicleSnapshot {
    #[serde(flatten)]
    pub telemetry: TelemetryFrame,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub heading: f32,
}

#[derive(Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub leader: Option<VehicleHandle>,
    pub vehicles: Vec<VehicleSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<TelemetryEvent>,
}

pub struct SharedGameState {
    pub sim: Simulation<PhysicsWorld>,
    pub clients: Vec<UnboundedSender<String>>,
    pub humans: HashMap<String, VehicleHandle>,
    human_config: Arc<VehicleConfig>,
    track: Arc<PathSpec>,
    events: UnboundedReceiver<TelemetryEvent>,
}

impl SharedGameState {
    pub fn new(mut sim: Simulation<PhysicsWorld>, human_config: Arc<VehicleConfig>, track: Arc<PathSpec>) -> Self {
        let (_, events) = sim.telemetry_mut().subscribe();
        Self {
            sim,
            clients: Vec::new(),
            humans: HashMap::new(),
            human_config,
            track,
            events,
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) {
        self.clients.push(tx);
    }

    /// Spawns a human-driven vehicle behind the start line. The first human
    /// to join while there is no leader becomes the leader.
    pub fn add_human(&mut self, player_id: &str) -> Result<VehicleHandle, ConfigError> {
        let slot = self.humans.len() as f32 + 1.0;
        let (position, heading) = self
            .track
            .sample(-slot * HUMAN_GRID_SPACING)
            .map(|(p, dir)| (p, heading_of(dir).unwrap_or(0.0)))
            .unwrap_or((Vec3::new(0.0, 0.0, -slot * HUMAN_GRID_SPACING), 0.0));

        let handle = self.sim.add_vehicle(
            self.human_config.clone(),
            Controller::Human(Command::IDLE),
            position,
            heading,
        )?;
        self.humans.insert(player_id.to_string(), handle);

        if self.sim.leader().is_none() {
            self.sim.set_leader(Some(handle));
        }
        info!(player = %player_id, %handle, "human vehicle spawned");
        Ok(handle)
    }

    pub fn remove_human(&mut self, player_id: &str) {
        let Some(handle) = self.humans.remove(player_id) else { return };
        self.sim.remove_vehicle(handle);
        if self.sim.leader().is_none() {
            let next = self.humans.values().min().copied();
            if next.is_some() {
                self.sim.set_leader(next);
            }
        }
    }

    pub fn update_input(&mut self, player_id: &str, command: Command) -> bool {
        match self.humans.get(player_id) {
            Some(handle) => self.sim.set_human_command(*handle, command),
            None => false,
        }
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let players: HashMap<VehicleHandle, &String> = self.humans.iter().map(|(id, h)| (*h, id)).collect();
        let vehicles = self
            .sim
            .frames()
            .into_iter()
            .filter_map(|frame| {
                let state = self.sim.state(frame.handle)?;
                Some(VehicleSnapshot {
                    telemetry: frame,
                    player: players.get(&frame.handle).map(|id| id.to_string()),
                    x: state.position.x,
                    y: state.position.y,
                    z: state.position.z,
                    heading: state.heading,
                })
            })
            .collect();

        let events = std::iter::from_fn(|| self.events.try_recv().ok()).collect();

        Snapshot {
            kind: "snapshot",
            tick: self.sim.tick_count(),
            leader: self.sim.leader(),
            vehicles,
            events,
        }
    }

    /// Build and send a snapshot of all vehicles to all clients; clients
    /// whose channel is closed are dropped.
    pub fn broadcast_snapshot(&mut self) {
        let snapshot = self.snapshot();
        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize snapshot");
                return;
            }
        };

        self.clients.retain(|tx| tx.send(json.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::gt86;
    use tokio::sync::mpsc::unbounded_channel;

    fn game() -> SharedGameState {
        let track = Arc::new(PathSpec::oval(Vec3::zeros(), 60.0, 40.0, 24));
        SharedGameState::new(Simulation::new(PhysicsWorld::new()), Arc::new(gt86()), track)
    }

    #[test]
    fn first_human_leads_and_leadership_passes_on() {
        let mut g = game();
        let a = g.add_human("a").unwrap();
        let b = g.add_human("b").unwrap();
        assert_eq!(g.sim.leader(), Some(a));
        g.remove_human("a");
        assert_eq!(g.sim.leader(), Some(b));
        assert!(g.sim.state(a).is_none());
    }

    #[test]
    fn input_reaches_only_known_players() {
        let mut g = game();
        g.add_human("a").unwrap();
        let go = Command { throttle: 1.0, ..Command::IDLE };
        assert!(g.update_input("a", go));
        assert!(!g.update_input("ghost", go));
    }

    #[test]
    fn snapshot_reaches_clients_and_prunes_closed_ones() {
        let mut g = game();
        g.add_human("a").unwrap();
        let (tx, mut rx) = unbounded_channel();
        let (dead_tx, dead_rx) = unbounded_channel();
        drop(dead_rx);
        g.register_client(tx);
        g.register_client(dead_tx);

        g.sim.tick(1.0 / 60.0);
        g.broadcast_snapshot();

        let msg = rx.try_recv().unwrap();
        let v: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(v["type"], "snapshot");
        assert_eq!(v["vehicles"][0]["player"], "a");
        assert!(v["vehicles"][0]["boost_charge"].is_number());
        assert_eq!(g.clients.len(), 1);
    }
}
