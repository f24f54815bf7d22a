//! WebSocket entry point for greenroom.
//!
//! The gateway owns the listening socket. Each accepted connection is
//! upgraded, its bearer credential resolved through a [`TokenVerifier`],
//! and on success subscribed to the lobby hub: the first frame is a
//! snapshot of the open rooms, every later frame a lifecycle event.
//! Rejected credentials close the socket with the policy close code
//! [`CLOSE_UNAUTHORIZED`](greenroom_protocol::CLOSE_UNAUTHORIZED) and
//! never reach the hub.

mod auth;
mod error;
mod gateway;

pub use auth::{AuthError, Claims, JwtVerifier, TokenVerifier};
pub use error::GatewayError;
pub use gateway::LobbyGateway;
