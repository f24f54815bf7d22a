//! Unified error type for the greenroom facade.

use greenroom_gateway::GatewayError;
use greenroom_protocol::ProtocolError;
use greenroom_store::StoreError;

/// Top-level error that wraps all member-crate errors.
///
/// When embedding through the `greenroom` crate, callers deal with this
/// single type instead of importing errors from each member crate. The
/// `#[from]` impls let `?` convert member errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GreenroomError {
    /// A wire-format error (encode, decode, malformed code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-store error (validation, membership, storage).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A gateway error (bind, accept, socket).
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_error() {
        let err = StoreError::EmptyName;
        let wrapped: GreenroomError = err.into();
        assert!(matches!(wrapped, GreenroomError::Store(_)));
        assert!(wrapped.to_string().contains("name"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidCode("nope".into());
        let wrapped: GreenroomError = err.into();
        assert!(matches!(wrapped, GreenroomError::Protocol(_)));
    }

    #[test]
    fn test_from_gateway_error() {
        let err = GatewayError::Bind(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "taken",
        ));
        let wrapped: GreenroomError = err.into();
        assert!(matches!(wrapped, GreenroomError::Gateway(_)));
        assert!(wrapped.to_string().contains("taken"));
    }
}
