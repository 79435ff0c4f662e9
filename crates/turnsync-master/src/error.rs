//! Error types for the master.

use turnsync_protocol::{GameId, ProtocolError};
use turnsync_transport::TransportError;

/// Errors that end a server or a connection.
#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    /// A transport-level error (bind, accept, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Why the master refused to apply an action.
///
/// Refusals are never sent back: the client simply never sees an update
/// for its action. They are returned so callers can log them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Nobody has synced this game yet, so it has no state.
    #[error("game {0} does not exist")]
    UnknownGame(GameId),

    /// The client acted on a version the master has moved past.
    #[error("stale action: game at version {current}, client at {sent}")]
    StaleVersion { current: u64, sent: u64 },

    /// Client-only actions are never applied by the master.
    #[error("client-only action {0:?} reached the master")]
    ClientOnly(String),

    /// The game's rules refused the action.
    #[error("invalid action: {0}")]
    Invalid(String),
}
