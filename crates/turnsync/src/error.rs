//! Unified error type for the turnsync crates.

use turnsync_client::ClientError;
use turnsync_master::MasterError;
use turnsync_protocol::ProtocolError;
use turnsync_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TurnsyncError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A client-level error (configuration).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A master-level error (bind, connection handling).
    #[error(transparent)]
    Master(#[from] MasterError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let turnsync_err: TurnsyncError = err.into();
        assert!(matches!(turnsync_err, TurnsyncError::Transport(_)));
        assert!(turnsync_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let turnsync_err: TurnsyncError = err.into();
        assert!(matches!(turnsync_err, TurnsyncError::Protocol(_)));
    }

    #[test]
    fn test_from_client_error() {
        let err = ClientError::InvalidConfig("no seats".into());
        let turnsync_err: TurnsyncError = err.into();
        assert!(matches!(turnsync_err, TurnsyncError::Client(_)));
        assert!(turnsync_err.to_string().contains("no seats"));
    }

    #[test]
    fn test_from_master_error() {
        let err = MasterError::from(TransportError::Shutdown);
        let turnsync_err: TurnsyncError = err.into();
        assert!(matches!(turnsync_err, TurnsyncError::Master(_)));
    }
}
