//! Core protocol types for turnsync's wire format.
//!
//! Everything in this module either travels between a client and the
//! master or is the key used to route it. The client core and the master
//! both build on these types, so a namespace without an explicit instance
//! resolves to the same [`GameId`] on both sides.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// Instance name used when a client has not picked a game instance.
pub const DEFAULT_INSTANCE: &str = "default";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The composite session key: `"<namespace>:<instance>"`.
///
/// Every inbound update or sync names the `GameId` it targets and clients
/// compare it against their own with exact string equality, so the key is
/// kept as the already-joined string rather than as two fields.
///
/// Keys built locally go through [`GameId::compose`], which refuses an
/// empty namespace. Keys read off the wire are taken as-is: a peer may
/// legitimately name a game this client has never heard of, and that
/// message simply fails the equality check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Builds the key for `namespace` and an optional instance id.
    ///
    /// A missing instance resolves to [`DEFAULT_INSTANCE`]. Any instance
    /// string is accepted, including the empty string.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if `namespace` is empty
    /// or contains the `:` separator.
    pub fn compose(
        namespace: &str,
        instance: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        if namespace.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "game id namespace must not be empty".into(),
            ));
        }
        if namespace.contains(':') {
            return Err(ProtocolError::InvalidMessage(format!(
                "game id namespace {namespace:?} must not contain ':'"
            )));
        }
        let instance = instance.unwrap_or(DEFAULT_INSTANCE);
        Ok(Self(format!("{namespace}:{instance}")))
    }

    /// Returns the key for the same namespace with a different instance.
    ///
    /// Cannot fail: the namespace was already checked when `self` was
    /// composed.
    pub fn with_instance(&self, instance: Option<&str>) -> Self {
        let instance = instance.unwrap_or(DEFAULT_INSTANCE);
        Self(format!("{}:{instance}", self.namespace()))
    }

    /// Returns the key as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first `:`.
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(ns, _)| ns)
    }

    /// The part after the first `:`, or `None` for a raw key with no
    /// separator.
    pub fn instance(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, instance)| instance)
    }
}

/// Wraps a raw key without validation. Used for keys that arrive from a
/// peer, which only ever get compared.
impl From<&str> for GameId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for GameId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A seat within a game instance.
///
/// Seats are named by the game (`"0"`, `"1"`, `"spectator"`, ...), so this
/// wraps a `String` rather than a number. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the seat name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// State and actions
// ---------------------------------------------------------------------------

/// A versioned snapshot of one game instance.
///
/// `version` is assigned by the master and only ever grows; it is the only
/// ordering signal a client has. A frame without a `version` field decodes
/// as version 0.
///
/// `payload` is whatever the game's reducer produces. Nothing in the
/// transport or reconciliation path looks inside it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Master-assigned version counter.
    #[serde(default)]
    pub version: u64,

    /// Opaque game data.
    #[serde(default)]
    pub payload: Value,
}

impl GameState {
    /// Creates a state at `version` holding `payload`.
    pub fn new(version: u64, payload: Value) -> Self {
        Self { version, payload }
    }
}

/// A move or command, opaque to everything but the game's reducer.
///
/// Serialized with the kind under `"type"`:
///
/// ```text
/// { "type": "MAKE_MOVE", "payload": { "cell": 4 } }
/// ```
///
/// `client_only` marks actions that exist purely to drive the local
/// replica (such as a reset) and must never be forwarded to the master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The action kind, interpreted by the game's reducer.
    #[serde(rename = "type")]
    pub kind: String,

    /// Action arguments.
    #[serde(default)]
    pub payload: Value,

    /// Whether this action stays on the client.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub client_only: bool,
}

impl Action {
    /// Kind used by [`Action::reset`].
    pub const RESET: &'static str = "RESET";

    /// Creates a forwardable action.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            client_only: false,
        }
    }

    /// The client-only action that clears a replica ahead of a resync.
    pub fn reset() -> Self {
        Self {
            kind: Self::RESET.into(),
            payload: Value::Null,
            client_only: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

/// Frames a client sends to the master.
///
/// Internally tagged, so a sync request looks like:
///
/// ```text
/// { "type": "Sync", "game_id": "default:test", "player_id": null, "num_players": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// "Apply `action` to the state I believe is at `version`."
    Update {
        action: Action,
        version: u64,
        game_id: GameId,
        player_id: Option<PlayerId>,
    },

    /// "Send me the full state of `game_id`."
    ///
    /// `num_players` tells the master how many seats to set up if the
    /// game does not exist yet.
    Sync {
        game_id: GameId,
        player_id: Option<PlayerId>,
        num_players: usize,
    },
}

/// Frames the master pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// An incremental state change, broadcast after an accepted action.
    Update { game_id: GameId, state: GameState },

    /// A full snapshot, sent in answer to a sync request.
    Sync { game_id: GameId, state: GameState },
}

impl ServerMessage {
    /// The session key this frame targets.
    pub fn game_id(&self) -> &GameId {
        match self {
            Self::Update { game_id, .. } | Self::Sync { game_id, .. } => {
                game_id
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
