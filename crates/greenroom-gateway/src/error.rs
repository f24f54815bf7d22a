/// Errors raised by the connection gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Binding the listen address failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// The WebSocket upgrade handshake failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    /// Sending a frame to the client failed.
    #[error("send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),

    /// Encoding an event for the wire failed.
    #[error(transparent)]
    Protocol(#[from] greenroom_protocol::ProtocolError),
}
