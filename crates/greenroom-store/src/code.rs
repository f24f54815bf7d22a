//! Room code generation.
//!
//! Codes are six characters alternating uppercase letter and digit
//! (`A1B2C3`), drawn uniformly per slot. That gives 26^3 * 10^3, about
//! 17.6 million, possible codes, so collisions against a healthy store
//! are rare and a rejected candidate is simply redrawn.

use rand::Rng;
use tracing::{debug, error};

use greenroom_protocol::RoomCode;

use crate::StoreError;

/// Draws one random room code.
pub fn generate(rng: &mut impl Rng) -> RoomCode {
    let mut raw = String::with_capacity(RoomCode::LEN);
    for slot in 0..RoomCode::LEN {
        let ch = if slot % 2 == 0 {
            (b'A' + rng.random_range(0u8..26)) as char
        } else {
            (b'0' + rng.random_range(0u8..10)) as char
        };
        raw.push(ch);
    }
    RoomCode::new(raw).expect("alternating letter-digit string is a valid code")
}

/// Draws codes until one passes the `exists` check, up to `max_attempts`.
///
/// # Errors
/// Returns [`StoreError::GeneratorExhausted`] if every attempt collided.
/// With a uniform generator the expected attempt count stays near 1 until
/// the store holds a large share of the code space, so exhausting a cap
/// in the hundreds points at store corruption or generator bias.
pub fn generate_unique(
    rng: &mut impl Rng,
    mut exists: impl FnMut(&RoomCode) -> bool,
    max_attempts: usize,
) -> Result<RoomCode, StoreError> {
    for attempt in 1..=max_attempts {
        let code = generate(rng);
        if !exists(&code) {
            if attempt > 1 {
                debug!(attempt, %code, "room code collision resolved");
            }
            return Ok(code);
        }
    }
    error!(attempts = max_attempts, "room code generation exhausted");
    Err(StoreError::GeneratorExhausted {
        attempts: max_attempts,
    })
}
