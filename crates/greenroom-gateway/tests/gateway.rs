//! Integration tests for the gateway over real WebSocket connections.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use greenroom_gateway::{Claims, JwtVerifier, LobbyGateway};
use greenroom_hub::{HubConfig, RoomsHub};
use greenroom_protocol::{decode_event, LobbyEvent, UserId, CLOSE_UNAUTHORIZED};
use greenroom_store::{
    BcryptHasher, CreateRoom, MemoryStorage, RoomStore, StoreConfig,
};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

const SECRET: &str = "gateway-test-secret";

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

type TestStore = RoomStore<MemoryStorage, BcryptHasher>;

// =========================================================================
// Helpers
// =========================================================================

fn token_for(user: u64) -> String {
    token_with_exp(user, chrono::Utc::now().timestamp() + 3_600)
}

fn token_with_exp(user: u64, exp: i64) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &Claims { user_id: user, exp },
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_ref()),
    )
    .expect("token encodes")
}

fn public_room(name: &str, author: u64) -> CreateRoom {
    CreateRoom {
        name: name.into(),
        author: UserId(author),
        max_players: 4,
        is_private: false,
        password: None,
    }
}

/// Starts a gateway on a random port and returns the pieces a test
/// needs to drive it.
async fn start_gateway() -> (String, TestStore, RoomsHub) {
    let hub = RoomsHub::new(HubConfig::default());
    let config = StoreConfig {
        start_delay: Duration::from_secs(300),
        ..StoreConfig::default()
    };
    let store = RoomStore::new(
        MemoryStorage::default(),
        BcryptHasher::with_cost(4),
        hub.clone(),
        config,
    );

    let gateway = LobbyGateway::bind(
        "127.0.0.1:0",
        store.clone(),
        hub.clone(),
        JwtVerifier::new(SECRET),
    )
    .await
    .expect("gateway should bind");
    let addr = gateway
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = gateway.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, store, hub)
}

/// Connects with the given Authorization header value.
async fn connect_with_header(addr: &str, authorization: &str) -> ClientWs {
    let mut request = format!("ws://{addr}")
        .into_client_request()
        .expect("request");
    request
        .headers_mut()
        .insert("authorization", authorization.parse().expect("header value"));
    let (ws, _) = tokio_tungstenite::connect_async(request)
        .await
        .expect("should connect");
    ws
}

async fn connect_plain(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// Reads the next text frame and decodes it as a lobby event.
async fn next_event(ws: &mut ClientWs) -> LobbyEvent {
    loop {
        let msg = ws
            .next()
            .await
            .expect("stream open")
            .expect("frame readable");
        match msg {
            Message::Text(text) => return decode_event(&text).expect("event decodes"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Expects the server to close the connection with the policy code.
async fn expect_policy_close(ws: &mut ClientWs) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Close(Some(frame)))) => {
                assert_eq!(frame.code, CloseCode::from(CLOSE_UNAUTHORIZED));
                return frame.reason.to_string();
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}

// =========================================================================
// Credential handling
// =========================================================================

#[tokio::test]
async fn test_valid_token_receives_snapshot_seed() {
    let (addr, store, _hub) = start_gateway().await;
    let room = store.create(public_room("lobby", 1)).await.unwrap();

    let mut ws = connect_with_header(&addr, &format!("Bearer {}", token_for(7))).await;

    match next_event(&mut ws).await {
        LobbyEvent::OpenRooms { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].code, room.code);
        }
        other => panic!("expected OpenRooms seed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_raw_token_without_bearer_prefix() {
    let (addr, _store, _hub) = start_gateway().await;
    let mut ws = connect_with_header(&addr, &token_for(7)).await;

    match next_event(&mut ws).await {
        LobbyEvent::OpenRooms { rooms } => assert!(rooms.is_empty()),
        other => panic!("expected OpenRooms seed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_token_query_param_fallback() {
    let (addr, _store, _hub) = start_gateway().await;
    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/?token={}", token_for(7)))
            .await
            .expect("should connect");

    match next_event(&mut ws).await {
        LobbyEvent::OpenRooms { rooms } => assert!(rooms.is_empty()),
        other => panic!("expected OpenRooms seed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_token_closed_with_policy_code() {
    let (addr, _store, hub) = start_gateway().await;
    let mut ws = connect_plain(&addr).await;

    let reason = expect_policy_close(&mut ws).await;
    assert!(reason.contains("missing"));

    // The connection never reached the hub.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_invalid_token_closed_with_policy_code() {
    let (addr, _store, hub) = start_gateway().await;
    let mut ws = connect_with_header(&addr, "Bearer garbage").await;

    let reason = expect_policy_close(&mut ws).await;
    assert!(reason.contains("invalid"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_expired_token_closed_with_policy_code() {
    let (addr, _store, _hub) = start_gateway().await;
    // Well past the verifier's validation leeway.
    let expired = token_with_exp(7, chrono::Utc::now().timestamp() - 300);
    let mut ws = connect_with_header(&addr, &expired).await;

    let reason = expect_policy_close(&mut ws).await;
    assert!(reason.contains("expired"));
}

// =========================================================================
// Event pump
// =========================================================================

#[tokio::test]
async fn test_lifecycle_events_reach_client() {
    let (addr, store, _hub) = start_gateway().await;
    let mut ws = connect_with_header(&addr, &token_for(7)).await;
    next_event(&mut ws).await; // seed

    let room = store.create(public_room("arena", 1)).await.unwrap();
    match next_event(&mut ws).await {
        LobbyEvent::RoomCreated { room: snap } => {
            assert_eq!(snap.code, room.code);
            assert_eq!(snap.members, vec![UserId(1)]);
        }
        other => panic!("expected RoomCreated, got {other:?}"),
    }

    store.mark_started(&room.code).await.unwrap();
    match next_event(&mut ws).await {
        LobbyEvent::RoomStarted { room: snap } => {
            assert_eq!(snap.code, room.code);
            assert!(snap.started);
        }
        other => panic!("expected RoomStarted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_events_fan_out_to_all_clients() {
    let (addr, store, _hub) = start_gateway().await;
    let mut ws1 = connect_with_header(&addr, &token_for(1)).await;
    let mut ws2 = connect_with_header(&addr, &token_for(2)).await;
    next_event(&mut ws1).await;
    next_event(&mut ws2).await;

    let room = store.create(public_room("shared", 3)).await.unwrap();

    for ws in [&mut ws1, &mut ws2] {
        match next_event(ws).await {
            LobbyEvent::RoomCreated { room: snap } => assert_eq!(snap.code, room.code),
            other => panic!("expected RoomCreated, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_late_subscriber_seed_reflects_membership() {
    let (addr, store, _hub) = start_gateway().await;
    let room = store.create(public_room("filling up", 1)).await.unwrap();
    store.add_member(&room.code, UserId(2)).await.unwrap();

    let mut ws = connect_with_header(&addr, &token_for(9)).await;
    match next_event(&mut ws).await {
        LobbyEvent::OpenRooms { rooms } => {
            assert_eq!(rooms[0].members, vec![UserId(1), UserId(2)]);
        }
        other => panic!("expected OpenRooms seed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_disconnect_unsubscribes() {
    let (addr, _store, hub) = start_gateway().await;
    let mut ws = connect_with_header(&addr, &token_for(7)).await;
    next_event(&mut ws).await;
    assert_eq!(hub.subscriber_count(), 1);

    ws.send(Message::Close(None)).await.expect("close");
    drop(ws);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_client_frames_are_ignored() {
    let (addr, store, _hub) = start_gateway().await;
    let mut ws = connect_with_header(&addr, &token_for(7)).await;
    next_event(&mut ws).await;

    // The surface is one-way; stray client frames change nothing.
    ws.send(Message::text("make me a room")).await.expect("send");
    ws.send(Message::Binary(b"noise".to_vec().into()))
        .await
        .expect("send");

    let room = store.create(public_room("unbothered", 1)).await.unwrap();
    match next_event(&mut ws).await {
        LobbyEvent::RoomCreated { room: snap } => assert_eq!(snap.code, room.code),
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}
