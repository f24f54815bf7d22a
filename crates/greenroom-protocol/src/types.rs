//! Core types shared across the Greenroom crates.
//!
//! Everything here either travels on the wire (snapshots, events) or
//! identifies something that does (room codes, user ids, connection ids).
//! The JSON shapes are part of the client contract, so each one is pinned
//! by a test below.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

/// WebSocket close code sent when a connection fails authentication.
///
/// Application close codes live in the 4000-4999 range; clients match on
/// this exact value to distinguish "bad credential" from a network drop.
pub const CLOSE_UNAUTHORIZED: u16 = 4000;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user.
///
/// Newtype over `u64` so a user id can never be confused with any other
/// numeric id in a signature. `#[serde(transparent)]` keeps the JSON a
/// plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// Opaque identifier for one live connection.
///
/// Assigned by the gateway at accept time and used as the subscriber key
/// in the broadcast hub. Never serialized: it has no meaning outside the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Room codes
// ---------------------------------------------------------------------------

/// The 6-character public identifier of a room.
///
/// Format is letter-digit alternating, `L,D,L,D,L,D` (e.g. `A1B2C3`),
/// uppercase ASCII only. The constructor validates, and deserialization
/// goes through the constructor, so a held `RoomCode` is always
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a room code.
    pub const LEN: usize = 6;

    /// Validates and wraps a raw code string.
    pub fn new(code: impl Into<String>) -> Result<Self, ProtocolError> {
        let code = code.into();
        if is_valid_code(&code) {
            Ok(Self(code))
        } else {
            Err(ProtocolError::InvalidCode(code))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether `s` matches the room-code format: exactly 6 ASCII characters,
/// uppercase letters at even positions and digits at odd positions.
pub fn is_valid_code(s: &str) -> bool {
    s.len() == RoomCode::LEN
        && s.bytes().enumerate().all(|(i, b)| {
            if i % 2 == 0 {
                b.is_ascii_uppercase()
            } else {
                b.is_ascii_digit()
            }
        })
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// Manual impl so malformed codes are rejected at the deserialization
// boundary, not discovered later inside the store.
impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RoomCode::new(raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

/// The serialized view of a room carried by every lifecycle event.
///
/// This is everything a client needs to render an open-room list without a
/// follow-up fetch. The password hash is deliberately not a field here:
/// snapshots are the only room shape that ever leaves the process.
///
/// Field names are camelCase on the wire (`maxPlayers`, `isPrivate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Public room code.
    pub code: RoomCode,
    /// Author-supplied display name.
    pub name: String,
    /// Membership cap, between 2 and 6.
    pub max_players: usize,
    /// Whether joining requires a password.
    pub is_private: bool,
    /// Whether the room has started.
    pub started: bool,
    /// Current members, sorted by user id for a stable wire shape.
    pub members: Vec<UserId>,
    /// The creating user; always present in `members`.
    pub author: UserId,
}

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

/// An event fanned out to every subscribed connection.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, e.g.
/// `{ "type": "RoomCreated", "room": { ... } }`, which is what the client
/// switches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyEvent {
    /// A room was created and is open for joining.
    RoomCreated { room: RoomSnapshot },

    /// A room started (by timer or explicit trigger) and left the open
    /// list. The snapshot is the room's final pre-start membership.
    RoomStarted { room: RoomSnapshot },

    /// Synthetic event pushed to a subscriber at subscribe time: the full
    /// set of currently open rooms. Clients treat it as state replacement,
    /// which makes a duplicate `RoomCreated` for a listed room harmless.
    OpenRooms { rooms: Vec<RoomSnapshot> },
}

// =========================================================================
// Tests
// =========================================================================
