//! Unified error type for the dwauth server.

use dwauth_cipher::CipherError;
use dwauth_protocol::ProtocolError;
use dwauth_session::SessionError;
use dwauth_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DwauthError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (framing, payload decoding).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (directory failure, not logged in).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The cipher flag could not be persisted.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let dwauth_err: DwauthError = err.into();
        assert!(matches!(dwauth_err, DwauthError::Transport(_)));
        assert!(dwauth_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidLength(0);
        let dwauth_err: DwauthError = err.into();
        assert!(matches!(dwauth_err, DwauthError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let dwauth_err: DwauthError = SessionError::NotAuthenticated.into();
        assert!(matches!(dwauth_err, DwauthError::Session(_)));
        assert_eq!(dwauth_err.to_string(), "session is not authenticated");
    }
}
