//! Password hashing for private rooms.
//!
//! Plaintext passwords never reach storage: the store hashes at creation
//! and only the hash is kept. Hashing is delegated to a trait so tests
//! can cut bcrypt's work factor down.

use bcrypt::DEFAULT_COST;

use crate::StoreError;

/// Hashes and checks private-room passwords.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hashes a plaintext password for storage.
    fn hash(&self, plain: &str) -> Result<String, StoreError>;

    /// Whether `plain` matches a stored hash. A malformed hash counts
    /// as a mismatch.
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

/// Bcrypt-backed [`PasswordHasher`].
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl BcryptHasher {
    /// Hasher at bcrypt's default work factor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher at an explicit work factor. Tests use the bcrypt minimum
    /// of 4 to keep hashing out of their runtime.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, StoreError> {
        bcrypt::hash(plain, self.cost).map_err(|err| StoreError::Hash(err.to_string()))
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        bcrypt::verify(plain, hash).unwrap_or(false)
    }
}
