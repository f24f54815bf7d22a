//! The room store: sole mutation surface for room data.
//!
//! Rooms live in a table of per-room locks. The table locks are held
//! only for lookups and insertions; everything that mutates a room,
//! persists it, and snapshots it for an event happens under that one
//! room's lock, so mutations on the same code are linearizable while
//! different rooms never contend.
//!
//! Every mutation that changes what the open-room listing shows also
//! refreshes the listing index before any event is published. Hub
//! subscribers seed from that index, which closes the race between
//! subscribing and a concurrent mutation: a room is either in the seed
//! or arrives as a later event, never neither.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use greenroom_hub::RoomsHub;
use greenroom_protocol::{LobbyEvent, RoomCode, RoomSnapshot, UserId};
use greenroom_timer::ExpiryScheduler;

use crate::code;
use crate::config::StoreConfig;
use crate::password::PasswordHasher;
use crate::room::{Room, MAX_NAME_LEN, MAX_PLAYERS, MIN_PLAYERS};
use crate::storage::Storage;
use crate::StoreError;

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// Parameters for [`RoomStore::create`].
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// Display name, non-empty, at most [`MAX_NAME_LEN`] characters.
    pub name: String,

    /// The creating user, auto-joined as the first member.
    pub author: UserId,

    /// Membership cap, between [`MIN_PLAYERS`] and [`MAX_PLAYERS`].
    pub max_players: usize,

    /// Whether joining requires a password.
    pub is_private: bool,

    /// Join password; required non-empty for private rooms, ignored for
    /// public ones.
    pub password: Option<String>,
}

/// What [`RoomStore::mark_started`] did.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    /// The room transitioned to started just now; one `RoomStarted`
    /// event was published.
    Started(Room),

    /// The room had already started. Nothing changed and nothing was
    /// published.
    AlreadyStarted(Room),
}

impl StartOutcome {
    /// The room, in either case in its started state.
    pub fn room(&self) -> &Room {
        match self {
            Self::Started(room) | Self::AlreadyStarted(room) => room,
        }
    }

    /// Whether this call performed the transition.
    pub fn newly_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

struct StoreInner<S, H> {
    /// Live (unstarted) rooms. The outer lock guards the table only;
    /// room state is guarded by the per-room mutex.
    rooms: RwLock<HashMap<RoomCode, Arc<Mutex<Room>>>>,

    /// Every code this process knows to be taken: live rooms, rooms
    /// retired after starting, and storage hits learned during
    /// allocation. Codes are never removed once a room is durable, so
    /// a historical room's code stays burned. Doubles as the
    /// reservation point for creates: inserting here claims the code.
    codes: RwLock<HashSet<RoomCode>>,

    /// Open-room listing, readable without touching any room lock.
    /// Sorted by code so a single listing call is stably ordered.
    open: RwLock<BTreeMap<RoomCode, RoomSnapshot>>,

    storage: S,
    hasher: H,
    hub: RoomsHub,
    scheduler: ExpiryScheduler,
    config: StoreConfig,
}

/// Room table and lifecycle transitions.
///
/// Cheap to clone; all clones share the same table, storage handle, and
/// expiry scheduler. Construction spawns the fire loop that turns
/// elapsed expiry timers into [`mark_started`](Self::mark_started)
/// calls, so a Tokio runtime must be running.
pub struct RoomStore<S, H> {
    inner: Arc<StoreInner<S, H>>,
}

impl<S, H> Clone for RoomStore<S, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Storage, H: PasswordHasher> RoomStore<S, H> {
    /// Creates a store over the given backends and starts its fire loop.
    pub fn new(storage: S, hasher: H, hub: RoomsHub, config: StoreConfig) -> Self {
        let config = config.validated();
        let (scheduler, fire_rx) = ExpiryScheduler::new();
        let store = Self {
            inner: Arc::new(StoreInner {
                rooms: RwLock::new(HashMap::new()),
                codes: RwLock::new(HashSet::new()),
                open: RwLock::new(BTreeMap::new()),
                storage,
                hasher,
                hub,
                scheduler,
                config,
            }),
        };
        tokio::spawn(run_fire_loop(store.clone(), fire_rx));
        store
    }

    /// The store's effective configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Whether an expiry fire for `code` is still pending.
    pub fn is_armed(&self, code: &RoomCode) -> bool {
        self.inner.scheduler.is_armed(code)
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Validates and creates a room: unique code, author auto-joined,
    /// `RoomCreated` published, expiry armed.
    pub async fn create(&self, spec: CreateRoom) -> Result<Room, StoreError> {
        let CreateRoom {
            name,
            author,
            max_players,
            is_private,
            password,
        } = spec;

        if name.trim().is_empty() {
            return Err(StoreError::EmptyName);
        }
        let name_len = name.chars().count();
        if name_len > MAX_NAME_LEN {
            return Err(StoreError::NameTooLong(name_len));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
            return Err(StoreError::MaxPlayersOutOfRange(max_players));
        }
        // Public rooms ignore any supplied password; the plaintext is
        // hashed here and dropped.
        let password_hash = if is_private {
            let plain = password
                .filter(|p| !p.is_empty())
                .ok_or(StoreError::MissingPassword)?;
            Some(self.inner.hasher.hash(&plain)?)
        } else {
            None
        };

        let code = self.claim_code().await?;

        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::milliseconds(self.inner.config.start_delay.as_millis() as i64);
        let room = Room {
            code: code.clone(),
            name,
            author,
            members: HashSet::from([author]),
            max_players,
            password_hash,
            started: false,
            created_at,
            expires_at,
        };

        // Insert already locked: the room becomes visible in the table
        // but untouchable until the initial persist lands.
        let arc = Arc::new(Mutex::new(room));
        let guard = Arc::clone(&arc).lock_owned().await;
        self.inner.rooms.write().unwrap().insert(code.clone(), arc);

        if let Err(err) = self.inner.storage.persist(&guard).await {
            // The code was never returned to a caller or published, so
            // releasing the claim cannot strand anyone.
            self.inner.rooms.write().unwrap().remove(&code);
            self.inner.codes.write().unwrap().remove(&code);
            return Err(err.into());
        }

        let snapshot = guard.snapshot();
        let room = (*guard).clone();
        drop(guard);
        self.inner
            .open
            .write()
            .unwrap()
            .insert(code.clone(), snapshot.clone());

        // Publish before arming: with a zero start delay the fire path
        // could otherwise enqueue `RoomStarted` ahead of `RoomCreated`.
        self.inner.hub.publish(LobbyEvent::RoomCreated { room: snapshot });
        self.inner
            .scheduler
            .arm(code.clone(), self.inner.config.start_delay);

        info!(%code, %author, max_players, private = is_private, "room created");
        Ok(room)
    }

    /// Draws a code that is free in the burned set and in storage, and
    /// claims it so no concurrent create can take it.
    ///
    /// The burned set stands in for storage on everything this process
    /// has seen; the storage check backstops it for rooms persisted by
    /// an earlier process. A storage hit is learned into the burned set
    /// so the same code is never proposed twice.
    async fn claim_code(&self) -> Result<RoomCode, StoreError> {
        let max_attempts = self.inner.config.max_code_attempts;
        let mut rounds = 0usize;
        loop {
            rounds += 1;
            if rounds > max_attempts {
                error!(rounds, "room code allocation kept colliding with storage");
                return Err(StoreError::GeneratorExhausted {
                    attempts: max_attempts,
                });
            }

            let candidate = {
                let codes = self.inner.codes.read().unwrap();
                let mut rng = rand::rng();
                code::generate_unique(&mut rng, |c| codes.contains(c), max_attempts)?
            };

            if self.inner.storage.exists(&candidate).await? {
                self.inner.codes.write().unwrap().insert(candidate);
                continue;
            }

            // Claim; a false insert means another create raced this
            // exact candidate in between, so redraw.
            if self.inner.codes.write().unwrap().insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
    }

    /// Fetches a room by code, live or historical.
    ///
    /// Started rooms leave the live table but stay in storage, so an
    /// explicit lookup keeps working after the room is gone from
    /// listings.
    pub async fn get(&self, code: &RoomCode) -> Result<Room, StoreError> {
        let live = self.inner.rooms.read().unwrap().get(code).cloned();
        if let Some(arc) = live {
            return Ok(arc.lock().await.clone());
        }
        match self.inner.storage.load(code).await? {
            Some(room) => Ok(room),
            None => Err(StoreError::NotFound(code.clone())),
        }
    }

    /// Adds a member to an open room. Re-adding an existing member is a
    /// no-op returning the unchanged room.
    pub async fn add_member(&self, code: &RoomCode, user: UserId) -> Result<Room, StoreError> {
        let live = self.inner.rooms.read().unwrap().get(code).cloned();
        let Some(arc) = live else {
            return match self.inner.storage.load(code).await? {
                Some(room) if room.started => Err(StoreError::AlreadyStarted(code.clone())),
                _ => Err(StoreError::NotFound(code.clone())),
            };
        };

        let mut guard = arc.lock().await;
        if guard.started {
            return Err(StoreError::AlreadyStarted(code.clone()));
        }
        if guard.members.contains(&user) {
            return Ok(guard.clone());
        }
        if guard.members.len() == guard.max_players {
            return Err(StoreError::RoomFull(code.clone()));
        }

        guard.members.insert(user);
        if let Err(err) = self.inner.storage.persist(&guard).await {
            guard.members.remove(&user);
            return Err(err.into());
        }
        let snapshot = guard.snapshot();
        let room = (*guard).clone();
        drop(guard);
        self.inner.open.write().unwrap().insert(code.clone(), snapshot);

        debug!(%code, %user, members = room.members.len(), "member joined");
        Ok(room)
    }

    /// Removes a member from a room. Idempotent: an absent member, a
    /// started room, or the author leaving are all no-ops. The author
    /// stays a member for the room's whole life.
    pub async fn remove_member(&self, code: &RoomCode, user: UserId) -> Result<(), StoreError> {
        let live = self.inner.rooms.read().unwrap().get(code).cloned();
        let Some(arc) = live else {
            return match self.inner.storage.load(code).await? {
                // Membership is frozen after start; nothing to do.
                Some(room) if room.started => Ok(()),
                _ => Err(StoreError::NotFound(code.clone())),
            };
        };

        let mut guard = arc.lock().await;
        if guard.started {
            return Ok(());
        }
        if user == guard.author {
            debug!(%code, %user, "author leave ignored");
            return Ok(());
        }
        if !guard.members.remove(&user) {
            return Ok(());
        }
        if let Err(err) = self.inner.storage.persist(&guard).await {
            guard.members.insert(user);
            return Err(err.into());
        }
        let snapshot = guard.snapshot();
        drop(guard);
        self.inner.open.write().unwrap().insert(code.clone(), snapshot);

        debug!(%code, %user, "member left");
        Ok(())
    }

    /// Starts a room: flips `started`, persists, retires the room from
    /// the live table and open listing, and publishes `RoomStarted`.
    ///
    /// Idempotent: starting an already started room changes nothing and
    /// publishes nothing, reported as [`StartOutcome::AlreadyStarted`].
    /// The expiry fire and an explicit trigger converge here, so their
    /// race is harmless and exactly one `RoomStarted` goes out.
    pub async fn mark_started(&self, code: &RoomCode) -> Result<StartOutcome, StoreError> {
        let live = self.inner.rooms.read().unwrap().get(code).cloned();
        let Some(arc) = live else {
            return match self.inner.storage.load(code).await? {
                Some(room) if room.started => Ok(StartOutcome::AlreadyStarted(room)),
                _ => Err(StoreError::NotFound(code.clone())),
            };
        };

        let (snapshot, room) = {
            let mut guard = arc.lock().await;
            if guard.started {
                return Ok(StartOutcome::AlreadyStarted(guard.clone()));
            }
            guard.started = true;
            if let Err(err) = self.inner.storage.persist(&guard).await {
                // Roll back so a retry can perform the transition.
                guard.started = false;
                return Err(err.into());
            }
            (guard.snapshot(), (*guard).clone())
        };

        // Retire from the live table and listing; the code stays burned
        // and history stays in storage for explicit lookup.
        self.inner.rooms.write().unwrap().remove(code);
        self.inner.open.write().unwrap().remove(code);

        self.inner.hub.publish(LobbyEvent::RoomStarted { room: snapshot });
        info!(%code, "room started");
        Ok(StartOutcome::Started(room))
    }

    /// All open rooms, sorted by code. Reads only the listing index;
    /// safe to call from a hub seed closure.
    pub fn list_open(&self) -> Vec<RoomSnapshot> {
        self.inner.open.read().unwrap().values().cloned().collect()
    }

    /// Whether `plain` grants entry to `room`. Public rooms accept
    /// anything.
    pub fn verify_password(&self, room: &Room, plain: &str) -> bool {
        match &room.password_hash {
            Some(hash) => self.inner.hasher.verify(plain, hash),
            None => true,
        }
    }

    /// Rebuilds the live table from storage after a restart and re-arms
    /// expiry timers from each room's persisted deadline. Rooms whose
    /// deadline already passed fire immediately.
    ///
    /// Returns how many rooms were restored. Until this runs, rooms
    /// from a previous process are visible to [`get`](Self::get) but not
    /// to mutations or listings.
    pub async fn restore(&self) -> Result<usize, StoreError> {
        let stored = self.inner.storage.list_unstarted().await?;
        let now = Utc::now();
        let mut restored = 0usize;

        for room in stored {
            let code = room.code.clone();
            let remaining = room
                .expires_at
                .signed_duration_since(now)
                .to_std()
                .unwrap_or_default();

            let arc = Arc::new(Mutex::new(room));
            let guard = Arc::clone(&arc).lock_owned().await;
            {
                let mut rooms = self.inner.rooms.write().unwrap();
                match rooms.entry(code.clone()) {
                    // Already live; leave the current state alone.
                    Entry::Occupied(_) => continue,
                    Entry::Vacant(slot) => {
                        slot.insert(arc);
                    }
                }
            }
            self.inner.codes.write().unwrap().insert(code.clone());
            let snapshot = guard.snapshot();
            self.inner.open.write().unwrap().insert(code.clone(), snapshot);
            drop(guard);

            self.inner.scheduler.arm(code, remaining);
            restored += 1;
        }

        if restored > 0 {
            info!(restored, "restored unstarted rooms from storage");
        }
        Ok(restored)
    }
}

// ---------------------------------------------------------------------------
// Expiry fire loop
// ---------------------------------------------------------------------------

/// Turns elapsed expiry timers into start transitions. Runs for the
/// life of the store.
async fn run_fire_loop<S: Storage, H: PasswordHasher>(
    store: RoomStore<S, H>,
    mut fired: mpsc::UnboundedReceiver<RoomCode>,
) {
    while let Some(code) = fired.recv().await {
        store.handle_fire(code).await;
    }
}

impl<S: Storage, H: PasswordHasher> RoomStore<S, H> {
    /// Drives one expiry fire to completion.
    ///
    /// A missed fire would leave a room permanently un-started, so
    /// transient storage failures are retried with doubling backoff.
    /// Everything else is terminal: an already started room means
    /// another path won the race, and a missing room means the code was
    /// never successfully created.
    async fn handle_fire(&self, code: RoomCode) {
        let attempts = self.inner.config.fire_attempts;
        let mut backoff = self.inner.config.fire_backoff;

        for attempt in 1..=attempts {
            match self.mark_started(&code).await {
                Ok(StartOutcome::Started(_)) => {
                    info!(%code, "room auto-started on expiry");
                    return;
                }
                Ok(StartOutcome::AlreadyStarted(_)) => {
                    debug!(%code, "expiry fired on already started room");
                    return;
                }
                Err(StoreError::Storage(err)) if attempt < attempts => {
                    warn!(%code, %err, attempt, "expiry start failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => {
                    error!(%code, %err, "expiry start abandoned");
                    return;
                }
            }
        }
    }
}
