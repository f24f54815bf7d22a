//! Minimal lobby server wired from environment variables.

use std::env;
use std::time::Duration;

use greenroom::prelude::*;
use tracing::info;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SECRET: &str = "dev-secret";

fn bind_addr() -> String {
    env::var("GREENROOM_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.into())
}

fn jwt_secret() -> String {
    env::var("GREENROOM_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.into())
}

fn start_delay() -> Duration {
    parse_delay(env::var("GREENROOM_START_DELAY_SECS").ok())
}

/// Parses a delay in whole seconds, falling back to the store default
/// when the variable is unset or malformed.
fn parse_delay(raw: Option<String>) -> Duration {
    raw.and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(StoreConfig::default().start_delay)
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

/// Logs every lobby event, giving the operator a live view of the room
/// table without attaching a websocket client.
async fn log_lobby_events(lobby: Lobby<MemoryStorage, BcryptHasher>) {
    // Gateway connection ids start at 1, so 0 is free for this loop.
    let (_sub, mut events) = lobby.subscribe(ConnectionId::new(0));
    while let Some(event) = events.recv().await {
        match &*event {
            LobbyEvent::OpenRooms { rooms } => {
                info!(open = rooms.len(), "lobby snapshot");
            }
            LobbyEvent::RoomCreated { room } => {
                info!(code = %room.code, max_players = room.max_players, "room created");
            }
            LobbyEvent::RoomStarted { room } => {
                info!(code = %room.code, players = room.members.len(), "room started");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    greenroom::init_tracing();

    let delay = start_delay();
    let server = GreenroomServerBuilder::new()
        .bind(&bind_addr())
        .store_config(StoreConfig {
            start_delay: delay,
            ..StoreConfig::default()
        })
        .build(JwtVerifier::new(&jwt_secret()))
        .await?;

    info!(delay_secs = delay.as_secs(), "lobby server ready");
    tokio::spawn(log_lobby_events(server.lobby()));

    server.run().await?;
    Ok(())
}
