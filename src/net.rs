use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::SharedGameState;
use crate::tire::Command;

const PONG: &str = r#"{"type":"pong"}"#;

/// Axes as sent by clients; anything missing is released.
#[derive(Debug, Default, Deserialize)]
struct InputAxes {
    #[serde(default)]
    throttle: f32,
    #[serde(default)]
    brake: f32,
    #[serde(default)]
    steer: f32,
    #[serde(default)]
    handbrake: bool,
    #[serde(default)]
    boost: bool,
}

impl From<InputAxes> for Command {
    fn from(a: InputAxes) -> Self {
        Command {
            throttle: a.throttle,
            brake: a.brake,
            steer: a.steer,
            handbrake: a.handbrake,
            boost: a.boost,
        }
        .sanitized()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Ping,
    Input(InputAxes),
}

pub async fn start_websocket_server(listener: TcpListener, state: Arc<Mutex<SharedGameState>>) {
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "websocket listening"),
        Err(e) => warn!(error = %e, "websocket listening on unknown address"),
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(raw, peer, state).await {
                debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

async fn handle_connection(
    raw: TcpStream,
    peer: SocketAddr,
    state: Arc<Mutex<SharedGameState>>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let ws = accept_async(raw).await?;
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Human vehicle for this client
    // -------------------------------
    let player_id = Uuid::new_v4().to_string();
    let spawned = {
        let mut game = state.lock().await;
        game.register_client(tx.clone());
        game.add_human(&player_id)
    };
    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            warn!(%peer, error = %e, "could not spawn a vehicle for client");
            send_task.abort();
            return Ok(());
        }
    };

    info!(%peer, player = %player_id, %handle, "player connected");

    let welcome = serde_json::json!({
        "type": "welcome",
        "player_id": player_id,
        "vehicle": handle,
    });
    let _ = tx.send(welcome.to_string());

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(player = %player_id, error = %e, "read failed");
                break;
            }
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => {
                let _ = tx.send(PONG.into());
            }
            Ok(ClientMessage::Input(axes)) => {
                state.lock().await.update_input(&player_id, axes.into());
            }
            Err(e) => debug!(player = %player_id, error = %e, "ignoring client message"),
        }
    }

    info!(player = %player_id, %handle, "player disconnected");
    state.lock().await.remove_human(&player_id);
    send_task.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_message_parses_with_missing_axes() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"input","throttle":0.5,"boost":true}"#).unwrap();
        let ClientMessage::Input(axes) = msg else { panic!("expected input") };
        let cmd: Command = axes.into();
        assert_eq!(cmd, Command { throttle: 0.5, boost: true, ..Command::IDLE });
    }

    #[test]
    fn out_of_range_axes_are_clamped() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"input","throttle":3,"steer":-9}"#).unwrap();
        let ClientMessage::Input(axes) = msg else { panic!("expected input") };
        let cmd: Command = axes.into();
        assert_eq!((cmd.throttle, cmd.steer), (1.0, -1.0));
    }

    #[test]
    fn ping_and_unknown_types() {
        assert!(matches!(serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#), Ok(ClientMessage::Ping)));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"warp"}"#).is_err());
    }
}
