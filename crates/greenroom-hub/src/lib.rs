//! Broadcast hub for lobby lifecycle events.
//!
//! One hub per process. Connections subscribe after authentication and
//! receive every published event until they unsubscribe or fall too far
//! behind. Delivery is best effort per subscriber: each connection gets a
//! bounded queue, and a connection that lets its queue overflow is
//! evicted rather than allowed to stall the publisher.
//!
//! Subscribing atomically enqueues a caller-supplied seed event (the
//! current open-room list) ahead of anything published afterwards, so a
//! late joiner never has to race a publish to learn current state.
//!
//! Events cross the channels as `Arc<LobbyEvent>`; a publish clones the
//! `Arc` per subscriber, not the event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use greenroom_protocol::{ConnectionId, LobbyEvent};

/// Receiving end of one subscriber's event queue.
///
/// The stream ending (`recv()` returning `None`) means the hub evicted
/// this subscriber; the owning connection should close.
pub type EventReceiver = mpsc::Receiver<Arc<LobbyEvent>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-subscriber outbound queue depth. A subscriber whose queue is
    /// full when an event arrives is dropped and unsubscribed.
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

impl HubConfig {
    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`RoomsHub::new`]. The queue must hold at
    /// least the seed event, so capacity is raised to 1 if set to 0.
    pub fn validated(mut self) -> Self {
        if self.queue_capacity == 0 {
            warn!("hub queue_capacity of 0 raised to 1");
            self.queue_capacity = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

struct Slot {
    tx: mpsc::Sender<Arc<LobbyEvent>>,
    // Distinguishes this registration from any earlier one under the
    // same id, so a superseded handle's drop cannot remove it.
    generation: u64,
}

struct HubInner {
    subscribers: HashMap<ConnectionId, Slot>,
    next_generation: u64,
}

/// Fan-out of lobby events to all subscribed connections.
///
/// Cheap to clone; all clones share the subscriber table. All operations
/// are non-blocking: the subscriber table lock is only ever held across
/// map updates and `try_send` calls.
#[derive(Clone)]
pub struct RoomsHub {
    inner: Arc<Mutex<HubInner>>,
    config: HubConfig,
}

impl RoomsHub {
    /// Creates an empty hub.
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                subscribers: HashMap::new(),
                next_generation: 0,
            })),
            config: config.validated(),
        }
    }

    /// Registers a connection and seeds its queue with one event.
    ///
    /// The `seed` closure runs under the hub lock, making it atomic with
    /// registration: a publish either completes before this call, in
    /// which case the state it updated ahead of publishing is visible to
    /// `seed`, or it lands in the new queue. Either way the subscriber
    /// misses nothing, and the seed is always the first event received.
    ///
    /// Subscribing an id that is already registered replaces the old
    /// queue; the previous receiver sees its stream end, and dropping
    /// the superseded handle leaves the replacement registered.
    pub fn subscribe(
        &self,
        id: ConnectionId,
        seed: impl FnOnce() -> LobbyEvent,
    ) -> (Subscription, EventReceiver) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);

        let mut inner = self.inner.lock().unwrap();
        // Capacity is at least 1 and the channel is fresh, so the seed
        // always fits.
        let _ = tx.try_send(Arc::new(seed()));
        let generation = inner.next_generation;
        inner.next_generation += 1;
        if inner.subscribers.insert(id, Slot { tx, generation }).is_some() {
            warn!(%id, "subscriber id reused, replacing previous queue");
        }
        let count = inner.subscribers.len();
        drop(inner);

        debug!(%id, subscribers = count, "connection subscribed");
        let subscription = Subscription {
            id,
            generation,
            hub: self.clone(),
        };
        (subscription, rx)
    }

    /// Removes a connection from the fan-out. Idempotent: unknown or
    /// already-removed ids are ignored.
    pub fn unsubscribe(&self, id: ConnectionId) {
        let removed = self.inner.lock().unwrap().subscribers.remove(&id);
        if removed.is_some() {
            debug!(%id, "connection unsubscribed");
        }
    }

    /// Removes `id` only while `generation` still names the current
    /// registration. A handle whose queue was replaced ends up here on
    /// drop and must not take the replacement with it.
    fn release(&self, id: ConnectionId, generation: u64) {
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .subscribers
            .get(&id)
            .is_some_and(|slot| slot.generation == generation);
        if current {
            inner.subscribers.remove(&id);
            debug!(%id, "connection unsubscribed");
        }
    }

    /// Delivers `event` to every current subscriber.
    ///
    /// Returns the number of subscribers the event was queued for.
    /// Subscribers with a full queue are evicted: their sender is removed
    /// and their receiver's stream ends. Publishing never blocks and
    /// never waits on a slow connection.
    ///
    /// Events from one publisher reach each subscriber in publish order;
    /// the fanout runs under the hub lock.
    pub fn publish(&self, event: LobbyEvent) -> usize {
        let event = Arc::new(event);
        let mut inner = self.inner.lock().unwrap();

        let mut evicted = Vec::new();
        let mut delivered = 0;
        for (id, slot) in &inner.subscribers {
            match slot.tx.try_send(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%id, "subscriber queue full, evicting");
                    evicted.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(%id, "subscriber queue closed, removing");
                    evicted.push(*id);
                }
            }
        }
        for id in evicted {
            inner.subscribers.remove(&id);
        }

        trace!(delivered, "event published");
        delivered
    }

    /// Number of currently subscribed connections.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }
}

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

/// Handle for one subscribed connection.
///
/// Dropping the handle unsubscribes, so a connection task cannot leak its
/// hub entry on any exit path, including panics. The drop removes only
/// the registration this handle created: once a re-subscribe under the
/// same id has replaced the queue, dropping the stale handle is a no-op.
pub struct Subscription {
    id: ConnectionId,
    generation: u64,
    hub: RoomsHub,
}

impl Subscription {
    /// The connection this subscription belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(self.id, self.generation);
    }
}
