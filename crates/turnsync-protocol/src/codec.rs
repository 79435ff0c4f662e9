//! Codec trait and implementations for serializing protocol frames.
//!
//! The client core and the master never touch raw bytes. They hand a
//! [`ClientMessage`](crate::ClientMessage) or
//! [`ServerMessage`](crate::ServerMessage) to a [`Codec`] and get bytes
//! back, which keeps the wire format swappable.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode values to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so a single codec can be shared by every
/// connection task on the master and by the client's background link task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON keeps frames readable in logs and browser tooling, and it is the
/// format the opaque [`GameState`](crate::GameState) payload already uses.
///
/// ## Example
///
/// ```rust
/// use turnsync_protocol::{ClientMessage, Codec, GameId, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg = ClientMessage::Sync {
///     game_id: GameId::compose("default", Some("lobby-1")).unwrap(),
///     player_id: None,
///     num_players: 2,
/// };
///
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded: ClientMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameState, ServerMessage};

    #[test]
    fn test_json_codec_decodes_server_sync() {
        let bytes = br#"{"type":"Sync","game_id":"default:default","state":{"version":3,"payload":{"turn":1}}}"#;
        let msg: ServerMessage = JsonCodec.decode(bytes).unwrap();
        match msg {
            ServerMessage::Sync { game_id, state } => {
                assert_eq!(game_id.as_str(), "default:default");
                assert_eq!(state.version, 3);
                assert_eq!(state.payload["turn"], 1);
            }
            other => panic!("expected Sync, got {other:?}"),
        }
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<GameState, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
