//! The embedder-facing handle to the room system.

use greenroom_hub::{EventReceiver, RoomsHub, Subscription};
use greenroom_protocol::{ConnectionId, LobbyEvent, RoomCode, RoomSnapshot, UserId};
use greenroom_store::{
    CreateRoom, PasswordHasher, Room, RoomStore, StartOutcome, Storage,
};

use crate::GreenroomError;

/// Application-side handle to rooms and the event stream.
///
/// All room mutations flow through this handle; the gateway's clients
/// only ever observe. Cheap to clone, and every clone sees the same
/// rooms.
pub struct Lobby<S, H> {
    store: RoomStore<S, H>,
    hub: RoomsHub,
}

impl<S, H> Clone for Lobby<S, H> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hub: self.hub.clone(),
        }
    }
}

impl<S: Storage, H: PasswordHasher> Lobby<S, H> {
    pub(crate) fn new(store: RoomStore<S, H>, hub: RoomsHub) -> Self {
        Self { store, hub }
    }

    /// Creates a room; the author joins automatically and the room
    /// auto-starts once the configured delay elapses.
    pub async fn create_room(&self, spec: CreateRoom) -> Result<Room, GreenroomError> {
        Ok(self.store.create(spec).await?)
    }

    /// Fetches a room by code, whether open or already started.
    pub async fn room(&self, code: &RoomCode) -> Result<Room, GreenroomError> {
        Ok(self.store.get(code).await?)
    }

    /// Adds `user` to an open room.
    pub async fn join_room(&self, code: &RoomCode, user: UserId) -> Result<Room, GreenroomError> {
        Ok(self.store.add_member(code, user).await?)
    }

    /// Removes `user` from a room. Idempotent; the author never leaves.
    pub async fn leave_room(&self, code: &RoomCode, user: UserId) -> Result<(), GreenroomError> {
        Ok(self.store.remove_member(code, user).await?)
    }

    /// Starts a room ahead of its timer.
    pub async fn start_room(&self, code: &RoomCode) -> Result<StartOutcome, GreenroomError> {
        Ok(self.store.mark_started(code).await?)
    }

    /// All rooms that have not started yet.
    pub fn open_rooms(&self) -> Vec<RoomSnapshot> {
        self.store.list_open()
    }

    /// Whether `password` grants entry to `room`. Public rooms accept
    /// anything; the check against private rooms is bcrypt-backed.
    pub fn verify_password(&self, room: &Room, password: &str) -> bool {
        self.store.verify_password(room, password)
    }

    /// Attaches an in-process subscriber to the lobby event stream,
    /// seeded with the current open-room listing. The gateway does this
    /// for every socket; embedders can do the same for bots or tests.
    pub fn subscribe(&self, id: ConnectionId) -> (Subscription, EventReceiver) {
        self.hub.subscribe(id, || LobbyEvent::OpenRooms {
            rooms: self.store.list_open(),
        })
    }

    /// Rebuilds the live table from storage and re-arms expiry timers.
    /// [`GreenroomServerBuilder`](crate::GreenroomServerBuilder) calls
    /// this during build; call it directly when embedding the store
    /// without the server.
    pub async fn restore(&self) -> Result<usize, GreenroomError> {
        Ok(self.store.restore().await?)
    }
}
