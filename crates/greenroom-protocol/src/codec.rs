//! JSON wire encoding for lobby events.
//!
//! The lobby speaks exactly one format: internally tagged JSON text
//! frames. Two free functions cover it; there is no codec abstraction to
//! swap because WebSocket text frames and JSON are part of the client
//! contract.

use crate::{LobbyEvent, ProtocolError};

/// Encodes an event as the JSON text sent in a WebSocket frame.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if serialization fails, which for
/// [`LobbyEvent`] indicates a bug rather than bad input.
pub fn encode_event(event: &LobbyEvent) -> Result<String, ProtocolError> {
    serde_json::to_string(event).map_err(ProtocolError::Encode)
}

/// Decodes a JSON text frame back into an event.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] if the text is not valid JSON or
/// does not match any event shape.
pub fn decode_event(text: &str) -> Result<LobbyEvent, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RoomCode, RoomSnapshot, UserId};

    fn snapshot() -> RoomSnapshot {
        RoomSnapshot {
            code: RoomCode::new("B2C3D4").unwrap(),
            name: "weekend game".into(),
            max_players: 2,
            is_private: true,
            started: false,
            members: vec![UserId(9)],
            author: UserId(9),
        }
    }

    #[test]
    fn test_encode_event_produces_tagged_json() {
        let text = encode_event(&LobbyEvent::RoomCreated { room: snapshot() }).unwrap();
        assert!(text.contains("\"type\":\"RoomCreated\""));
        assert!(text.contains("\"code\":\"B2C3D4\""));
    }

    #[test]
    fn test_decode_event_round_trips() {
        let event = LobbyEvent::RoomStarted { room: snapshot() };
        let text = encode_event(&event).unwrap();
        assert_eq!(decode_event(&text).unwrap(), event);
    }

    #[test]
    fn test_decode_event_rejects_invalid_json() {
        let result = decode_event("{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_event_rejects_unknown_type() {
        let result = decode_event(r#"{"type":"RoomRenamed","room":{}}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_event_rejects_malformed_code() {
        let text = r#"{"type":"OpenRooms","rooms":[{"code":"bad","name":"x","maxPlayers":2,"isPrivate":false,"started":false,"members":[1],"author":1}]}"#;
        let result = decode_event(text);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
