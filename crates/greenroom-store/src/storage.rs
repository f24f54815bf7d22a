//! Durable storage behind the room store.
//!
//! The store is agnostic to the storage engine. Anything that can
//! persist, load, and enumerate rooms by code works, as long as
//! operations on a single room's key are consistent: a completed
//! `persist` must be visible to a later `load` or `exists` for the same
//! code. [`MemoryStorage`] is the bundled backend; a database-backed one
//! implements the same trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use greenroom_protocol::RoomCode;

use crate::room::Room;
use crate::StorageError;

/// Storage primitives the room store runs on.
pub trait Storage: Send + Sync + 'static {
    /// Writes a room, replacing any previous record for its code.
    fn persist(
        &self,
        room: &Room,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Reads the room with this code, started or not.
    fn load(
        &self,
        code: &RoomCode,
    ) -> impl std::future::Future<Output = Result<Option<Room>, StorageError>> + Send;

    /// Whether any room, started or not, holds this code.
    fn exists(
        &self,
        code: &RoomCode,
    ) -> impl std::future::Future<Output = Result<bool, StorageError>> + Send;

    /// All rooms with `started == false`, used to rebuild the live table
    /// after a restart.
    fn list_unstarted(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Room>, StorageError>> + Send;
}

/// In-memory [`Storage`] backend.
///
/// Clones share the same table. Suitable for tests and single-process
/// deployments; contents are lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    rooms: Arc<Mutex<HashMap<RoomCode, Room>>>,
}

impl MemoryStorage {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    async fn persist(&self, room: &Room) -> Result<(), StorageError> {
        self.rooms
            .lock()
            .unwrap()
            .insert(room.code.clone(), room.clone());
        Ok(())
    }

    async fn load(&self, code: &RoomCode) -> Result<Option<Room>, StorageError> {
        Ok(self.rooms.lock().unwrap().get(code).cloned())
    }

    async fn exists(&self, code: &RoomCode) -> Result<bool, StorageError> {
        Ok(self.rooms.lock().unwrap().contains_key(code))
    }

    async fn list_unstarted(&self) -> Result<Vec<Room>, StorageError> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .filter(|room| !room.started)
            .cloned()
            .collect())
    }
}
