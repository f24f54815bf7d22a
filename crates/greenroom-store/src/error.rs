//! Error types for the store layer.

use greenroom_protocol::RoomCode;

/// Errors that can occur during room store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The room name is empty or whitespace only.
    #[error("room name must not be empty")]
    EmptyName,

    /// The room name exceeds the display length limit.
    #[error("room name too long: {0} characters (limit 100)")]
    NameTooLong(usize),

    /// The player cap is outside the supported range.
    #[error("max_players must be between 2 and 6, got {0}")]
    MaxPlayersOutOfRange(usize),

    /// A private room was requested without a password.
    #[error("private room requires a non-empty password")]
    MissingPassword,

    /// No live or stored room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room already holds `max_players` members.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The room has started and no longer accepts membership changes.
    #[error("room {0} already started")]
    AlreadyStarted(RoomCode),

    /// Code generation gave up after the configured attempt cap. This
    /// should never happen against a healthy store (the code space is
    /// ~17.6M) and indicates store corruption or generator bias.
    #[error("no free room code after {attempts} attempts")]
    GeneratorExhausted { attempts: usize },

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors reported by a [`Storage`](crate::Storage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation.
    /// Treated as transient: expiry fires retry on it.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
