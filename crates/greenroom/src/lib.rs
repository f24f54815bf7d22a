//! # Greenroom
//!
//! Real-time game room lifecycle engine. Rooms are created with short
//! shareable codes, track membership up to a cap, and start exactly
//! once: either by hand or automatically when a per-room delay elapses.
//! Every creation and start fans out to all connected WebSocket clients,
//! and each new client is seeded with the current open-room listing.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use greenroom::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GreenroomError> {
//!     greenroom::init_tracing();
//!
//!     let server = GreenroomServerBuilder::new()
//!         .bind("0.0.0.0:8080")
//!         .build(JwtVerifier::new("change-me"))
//!         .await?;
//!
//!     let lobby = server.lobby();
//!     tokio::spawn(async move {
//!         // Drive rooms from your application logic.
//!         let _ = lobby
//!             .create_room(CreateRoom {
//!                 name: "first room".into(),
//!                 author: UserId(1),
//!                 max_players: 4,
//!                 is_private: false,
//!                 password: None,
//!             })
//!             .await;
//!     });
//!
//!     server.run().await
//! }
//! ```

use std::sync::Once;

use tracing_subscriber::EnvFilter;

mod error;
mod lobby;
mod server;

pub use error::GreenroomError;
pub use lobby::Lobby;
pub use server::{GreenroomServer, GreenroomServerBuilder};

/// Installs a process-wide `tracing` subscriber that reads `RUST_LOG`,
/// defaulting to `info`. Safe to call more than once.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    });
}

/// One-import surface for embedding greenroom.
pub mod prelude {
    pub use greenroom_gateway::{AuthError, Claims, GatewayError, JwtVerifier, TokenVerifier};
    pub use greenroom_hub::{EventReceiver, HubConfig, RoomsHub, Subscription};
    pub use greenroom_protocol::{
        decode_event, encode_event, is_valid_code, ConnectionId, LobbyEvent, RoomCode,
        RoomSnapshot, UserId, CLOSE_UNAUTHORIZED,
    };
    pub use greenroom_store::{
        BcryptHasher, CreateRoom, MemoryStorage, PasswordHasher, Room, RoomStore, StartOutcome,
        Storage, StorageError, StoreConfig, StoreError,
    };

    pub use crate::{GreenroomError, GreenroomServer, GreenroomServerBuilder, Lobby};
}
