//! Store configuration.

use std::time::Duration;

use tracing::warn;

/// Tuning knobs for the room store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long after creation a room auto-starts. Process-wide; every
    /// room's expiry is `created_at + start_delay`.
    pub start_delay: Duration,

    /// Attempt cap for unique code generation before giving up.
    pub max_code_attempts: usize,

    /// How many times an expiry fire retries when storage is
    /// transiently unavailable.
    pub fire_attempts: u32,

    /// Delay before the first expiry-fire retry; doubles per retry.
    pub fire_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(10),
            max_code_attempts: 1_000,
            fire_attempts: 5,
            fire_backoff: Duration::from_millis(250),
        }
    }
}

impl StoreConfig {
    /// Upper bound on `start_delay`.
    pub const MAX_START_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`RoomStore::new`](crate::RoomStore::new).
    /// Rules:
    /// - `start_delay` capped to [`Self::MAX_START_DELAY`].
    /// - `max_code_attempts` and `fire_attempts` raised to at least 1.
    pub fn validated(mut self) -> Self {
        if self.start_delay > Self::MAX_START_DELAY {
            warn!(
                delay_secs = self.start_delay.as_secs(),
                "start_delay exceeds maximum, clamping to 24h"
            );
            self.start_delay = Self::MAX_START_DELAY;
        }
        if self.max_code_attempts == 0 {
            self.max_code_attempts = 1;
        }
        if self.fire_attempts == 0 {
            self.fire_attempts = 1;
        }
        self
    }
}
