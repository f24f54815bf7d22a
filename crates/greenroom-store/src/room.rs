//! The room record and its invariants.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use greenroom_protocol::{RoomCode, RoomSnapshot, UserId};

/// Smallest allowed `max_players`.
pub const MIN_PLAYERS: usize = 2;

/// Largest allowed `max_players`.
pub const MAX_PLAYERS: usize = 6;

/// Longest allowed room name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// A room as held by the store.
///
/// All mutation goes through [`RoomStore`](crate::RoomStore) entry
/// points; what callers get back from the store is a detached clone.
/// The store maintains the invariants: the author is always a member,
/// membership never exceeds `max_players`, `started` never reverts, and
/// a private room always carries a hash.
///
/// Unlike [`RoomSnapshot`], this record includes the password hash and
/// timestamps, and so never leaves the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    /// Public code, unique across live rooms, immutable.
    pub code: RoomCode,

    /// Author-supplied display name.
    pub name: String,

    /// The creating user; a member for the room's whole life.
    pub author: UserId,

    /// Current members, author included.
    pub members: HashSet<UserId>,

    /// Membership cap, between [`MIN_PLAYERS`] and [`MAX_PLAYERS`].
    pub max_players: usize,

    /// Bcrypt hash of the join password; `Some` exactly when private.
    pub password_hash: Option<String>,

    /// Whether the room has started. Flips false to true once, never
    /// back.
    pub started: bool,

    /// Creation time, immutable.
    pub created_at: DateTime<Utc>,

    /// When the room auto-starts: `created_at + start_delay`, immutable.
    pub expires_at: DateTime<Utc>,
}

impl Room {
    /// Whether joining requires a password.
    pub fn is_private(&self) -> bool {
        self.password_hash.is_some()
    }

    /// The serialized view of this room, as carried by lifecycle events.
    ///
    /// Members are sorted so the wire shape is stable; the password hash
    /// is not part of a snapshot.
    pub fn snapshot(&self) -> RoomSnapshot {
        let mut members: Vec<UserId> = self.members.iter().copied().collect();
        members.sort_unstable();
        RoomSnapshot {
            code: self.code.clone(),
            name: self.name.clone(),
            max_players: self.max_players,
            is_private: self.is_private(),
            started: self.started,
            members,
            author: self.author,
        }
    }
}
