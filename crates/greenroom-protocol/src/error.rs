//! Error types for the protocol layer.
//!
//! Each crate in Greenroom defines its own error enum, so a
//! `ProtocolError` always means a serialization or format problem, never
//! a store or networking one.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an event to JSON failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing an event from JSON failed. Common causes are
    /// malformed JSON, a missing field, or an unknown event type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A string does not match the room-code format (six characters,
    /// alternating uppercase letter and digit).
    #[error("invalid room code: {0:?}")]
    InvalidCode(String),
}
