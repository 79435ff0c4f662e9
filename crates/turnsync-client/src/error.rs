//! Error types for the client layer.
//!
//! Only construction can fail. Once a [`Transport`](crate::Transport)
//! exists, every inbound rejection is a silent drop.

use turnsync_protocol::ProtocolError;

/// Errors that can occur while setting up a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured namespace cannot form a session key.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A configuration value is out of range.
    #[error("invalid client config: {0}")]
    InvalidConfig(String),
}
