//! Room table, lifecycle transitions, and persistence for greenroom.
//!
//! The [`RoomStore`] is the only surface that mutates room data. It
//! validates creation input, allocates unique room codes, tracks
//! membership, flips rooms to started exactly once, and keeps a
//! [`Storage`] backend and the lobby event hub in step with every
//! change. Expiry timers armed at creation flow back in through the
//! store's fire loop, so a room starts on schedule even when nobody
//! triggers it by hand.
//!
//! Passwords for private rooms are hashed through the [`PasswordHasher`]
//! seam before a room ever reaches storage; plaintext is dropped inside
//! [`RoomStore::create`].

pub mod code;

mod config;
mod error;
mod password;
mod room;
mod storage;
mod store;

pub use config::StoreConfig;
pub use error::{StorageError, StoreError};
pub use password::{BcryptHasher, PasswordHasher};
pub use room::{Room, MAX_NAME_LEN, MAX_PLAYERS, MIN_PLAYERS};
pub use storage::{MemoryStorage, Storage};
pub use store::{CreateRoom, RoomStore, StartOutcome};
