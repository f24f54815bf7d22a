//! WebSocket listener, upgrade handshake, and the per-connection pump.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use greenroom_hub::RoomsHub;
use greenroom_protocol::{encode_event, ConnectionId, LobbyEvent, UserId, CLOSE_UNAUTHORIZED};
use greenroom_store::{PasswordHasher, RoomStore, Storage};

use crate::auth::{AuthError, TokenVerifier};
use crate::GatewayError;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Listens for WebSocket connections and pumps lobby events to every
/// authenticated client.
///
/// The lobby surface is one-way: clients receive events, they do not
/// send them. Inbound text and binary frames are ignored; pings are
/// answered by the protocol layer.
pub struct LobbyGateway<S, H, V> {
    listener: TcpListener,
    store: RoomStore<S, H>,
    hub: RoomsHub,
    verifier: Arc<V>,
}

impl<S, H, V> LobbyGateway<S, H, V>
where
    S: Storage,
    H: PasswordHasher,
    V: TokenVerifier,
{
    /// Binds the gateway to the given address.
    pub async fn bind(
        addr: &str,
        store: RoomStore<S, H>,
        hub: RoomsHub,
        verifier: V,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr).await.map_err(GatewayError::Bind)?;
        info!(addr, "lobby gateway listening");
        Ok(Self {
            listener,
            store,
            hub,
            verifier: Arc::new(verifier),
        })
    }

    /// The address the gateway actually bound. Useful with port 0.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process ends, one task per client.
    pub async fn run(self) -> Result<(), GatewayError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let store = self.store.clone();
                    let hub = self.hub.clone();
                    let verifier = Arc::clone(&self.verifier);
                    tokio::spawn(async move {
                        if let Err(err) = serve_socket(stream, store, hub, verifier).await {
                            debug!(%peer, %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => {
                    error!(%err, "accept failed");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection path
// ---------------------------------------------------------------------------

/// Pulls the bearer token out of the upgrade request: `Authorization`
/// header first (with or without a `Bearer ` prefix), then a `token`
/// query parameter for clients that cannot set headers.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get("authorization") {
        if let Ok(raw) = value.to_str() {
            let raw = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
            if !raw.is_empty() {
                return Some(raw.to_string());
            }
        }
    }
    request
        .uri()
        .query()
        .and_then(|query| query.split('&').find_map(|pair| pair.strip_prefix("token=")))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn resolve_credential<V: TokenVerifier>(
    verifier: &V,
    token: Option<&str>,
) -> Result<UserId, AuthError> {
    match token {
        Some(token) => verifier.verify(token).await,
        None => Err(AuthError::Missing),
    }
}

/// Completes the close handshake with the policy close code so clients
/// can tell a credential rejection from a transport failure.
async fn reject(mut ws: WsStream, err: &AuthError) -> Result<(), GatewayError> {
    let frame = CloseFrame {
        code: CloseCode::from(CLOSE_UNAUTHORIZED),
        reason: err.to_string().into(),
    };
    ws.close(Some(frame)).await.map_err(GatewayError::Send)?;
    Ok(())
}

/// Upgrades the socket, checks the credential, then pumps hub events to
/// the client until either side goes away.
async fn serve_socket<S, H, V>(
    stream: TcpStream,
    store: RoomStore<S, H>,
    hub: RoomsHub,
    verifier: Arc<V>,
) -> Result<(), GatewayError>
where
    S: Storage,
    H: PasswordHasher,
    V: TokenVerifier,
{
    let mut token = None;
    let ws = tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response: Response| {
        token = extract_token(request);
        Ok(response)
    })
    .await
    .map_err(GatewayError::Handshake)?;

    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));

    let user = match resolve_credential(verifier.as_ref(), token.as_deref()).await {
        Ok(user) => user,
        Err(err) => {
            warn!(%id, %err, "credential rejected");
            return reject(ws, &err).await;
        }
    };
    info!(%id, %user, "client connected");

    // Subscribing seeds the queue with the current open-room listing, so
    // the first frame the client sees is a full snapshot.
    let (subscription, mut events) = hub.subscribe(id, || LobbyEvent::OpenRooms {
        rooms: store.list_open(),
    });

    let (mut outbound, mut inbound) = ws.split();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    let frame = encode_event(&event)?;
                    outbound
                        .send(Message::text(frame))
                        .await
                        .map_err(GatewayError::Send)?;
                }
                // Queue gone: the hub evicted this connection for
                // falling behind.
                None => {
                    warn!(%id, %user, "event queue closed, dropping client");
                    let _ = outbound.close().await;
                    break;
                }
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!(%id, %user, "client disconnected");
                    break;
                }
                // One-way surface; client frames carry nothing.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%id, %err, "socket error");
                    break;
                }
            },
        }
    }

    drop(subscription);
    Ok(())
}
