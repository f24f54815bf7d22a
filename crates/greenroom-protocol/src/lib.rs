//! Wire protocol for Greenroom.
//!
//! This crate defines everything the lobby server and its clients agree
//! on:
//!
//! - **Types** ([`RoomCode`], [`UserId`], [`RoomSnapshot`],
//!   [`LobbyEvent`]) describe rooms and the lifecycle events fanned out
//!   to subscribers.
//! - **Codec** ([`encode_event`], [`decode_event`]) converts events
//!   to and from the JSON text frames carried over WebSocket.
//! - **Errors** ([`ProtocolError`]) cover malformed codes and codec
//!   failures.
//!
//! The protocol layer knows nothing about connections, storage, or
//! timers. It only pins down shapes, so every other crate depends on it
//! and none of them depend on each other's internals.

mod error;
mod types;

#[cfg(feature = "json")]
mod codec;

#[cfg(feature = "json")]
pub use codec::{decode_event, encode_event};
pub use error::ProtocolError;
pub use types::{
    is_valid_code, ConnectionId, LobbyEvent, RoomCode, RoomSnapshot, UserId,
    CLOSE_UNAUTHORIZED,
};
