//! Credential verification for incoming connections.
//!
//! The gateway does not issue tokens; it only resolves them. The
//! [`TokenVerifier`] trait is the seam: production deployments hand the
//! gateway a [`JwtVerifier`] over the secret their login service signs
//! with, and tests can substitute anything that maps tokens to users.

use greenroom_protocol::UserId;
use serde::{Deserialize, Serialize};

/// Why a credential was rejected.
///
/// Every variant closes the socket with the same policy close code; the
/// variant only drives the close reason and the log line.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented at all.
    #[error("credential is missing")]
    Missing,

    /// The credential was once valid but has expired.
    #[error("credential has expired")]
    Expired,

    /// The credential is malformed or failed verification.
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// Resolves a bearer credential to a user identity.
///
/// `Send + Sync + 'static` so one verifier can be shared by every
/// connection task for the life of the gateway.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Validates the given token and returns whose it is.
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, AuthError>> + Send;
}

/// Claims carried by greenroom access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user.
    pub user_id: u64,

    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

/// HS256 JWT verifier over a shared secret.
pub struct JwtVerifier {
    decoding_key: jsonwebtoken::DecodingKey,
    validation: jsonwebtoken::Validation,
}

impl JwtVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: jsonwebtoken::DecodingKey::from_secret(secret.as_ref()),
            validation: jsonwebtoken::Validation::default(),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(err.to_string()),
            })?;
        Ok(UserId(data.claims.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(secret: &str, user_id: u64, exp: i64) -> String {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &Claims { user_id, exp },
            &jsonwebtoken::EncodingKey::from_secret(secret.as_ref()),
        )
        .expect("token encodes")
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3_600
    }

    #[tokio::test]
    async fn test_verify_accepts_valid_token() {
        let verifier = JwtVerifier::new("secret");
        let user = verifier
            .verify(&token("secret", 42, far_future()))
            .await
            .expect("valid token");
        assert_eq!(user, UserId(42));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_secret() {
        let verifier = JwtVerifier::new("secret");
        match verifier.verify(&token("other", 42, far_future())).await {
            Err(AuthError::Invalid(_)) => {}
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let verifier = JwtVerifier::new("secret");
        // Past the default validation leeway.
        let exp = chrono::Utc::now().timestamp() - 120;
        match verifier.verify(&token("secret", 42, exp)).await {
            Err(AuthError::Expired) => {}
            other => panic!("expected Expired, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let verifier = JwtVerifier::new("secret");
        match verifier.verify("not-a-jwt").await {
            Err(AuthError::Invalid(_)) => {}
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
