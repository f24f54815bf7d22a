//! One-shot expiry timers for Greenroom rooms.
//!
//! Every room gets exactly one deferred fire, armed at creation for the
//! moment the room should auto-start. When the delay elapses, the room
//! code is delivered on a fire channel; the receiving side decides what a
//! fire means. The scheduler itself knows nothing about rooms beyond
//! their codes.
//!
//! There is no cancel operation. A room that is started manually before
//! its delay elapses still fires, and the consumer's start transition is
//! idempotent, so the late fire lands as a no-op. The armed set exists
//! only to enforce one pending fire per room.
//!
//! # Integration
//!
//! The fire channel is designed to feed a consumer loop:
//!
//! ```ignore
//! let (scheduler, mut fired) = ExpiryScheduler::new();
//! scheduler.arm(code, Duration::from_secs(10));
//! while let Some(code) = fired.recv().await {
//!     // drive the start transition for `code`
//! }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use greenroom_protocol::RoomCode;

/// Arms one deferred fire per room and reports fires on a channel.
///
/// Cheap to clone; all clones share the armed set and the fire channel.
/// [`arm`](Self::arm) spawns onto the current Tokio runtime, so a runtime
/// must be running when it is called.
#[derive(Clone)]
pub struct ExpiryScheduler {
    fire_tx: mpsc::UnboundedSender<RoomCode>,
    armed: Arc<Mutex<HashSet<RoomCode>>>,
}

impl ExpiryScheduler {
    /// Creates a scheduler and the receiving end of its fire channel.
    ///
    /// The caller owns the receiver. Once it is dropped, elapsed timers
    /// discard their fires, which only happens during shutdown.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RoomCode>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            fire_tx,
            armed: Arc::new(Mutex::new(HashSet::new())),
        };
        (scheduler, fire_rx)
    }

    /// Arms a one-shot fire for `code` after `delay`.
    ///
    /// Returns `false` without arming if a fire for this code is already
    /// pending. Each room gets at most one armed timer at a time.
    pub fn arm(&self, code: RoomCode, delay: Duration) -> bool {
        {
            let mut armed = self.armed.lock().unwrap();
            if !armed.insert(code.clone()) {
                warn!(%code, "expiry timer already armed, ignoring");
                return false;
            }
        }
        debug!(%code, delay_ms = delay.as_millis() as u64, "expiry timer armed");

        let armed = Arc::clone(&self.armed);
        let fire_tx = self.fire_tx.clone();
        // The deadline is `arm` time plus `delay`, sampled here: a sleep
        // created inside the task would measure from its first poll,
        // which lands after any clock advance that happened in between.
        let deadline = tokio::time::Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            armed.lock().unwrap().remove(&code);
            trace!(%code, "expiry timer fired");
            // A send error means the receiver is gone, i.e. shutdown.
            let _ = fire_tx.send(code);
        });
        true
    }

    /// Whether a fire for `code` is still pending.
    pub fn is_armed(&self, code: &RoomCode) -> bool {
        self.armed.lock().unwrap().contains(code)
    }

    /// Number of currently pending fires.
    pub fn armed_count(&self) -> usize {
        self.armed.lock().unwrap().len()
    }
}
