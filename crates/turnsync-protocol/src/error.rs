//! Error types for the protocol layer.
//!
//! Each turnsync crate owns its error enum. A `ProtocolError` always
//! means the problem is in encoding, decoding, or building a protocol
//! value, never in networking or reconciliation.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, a missing `"type"` tag, or a frame
    /// that belongs to the other direction of the protocol.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A value is well-formed JSON but violates a protocol rule, such as
    /// a session key built from an empty namespace.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
