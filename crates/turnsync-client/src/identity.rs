//! The identity resolver: which game instance and which seat.
//!
//! A client's session key is derived from its namespace and its game
//! instance; the seat travels alongside it. Both halves can be reassigned
//! at any time, and both count as an identity change for resync purposes.

use turnsync_protocol::{GameId, PlayerId, ProtocolError};

/// A client's session identity.
///
/// Owned by exactly one [`Transport`](crate::Transport), so several
/// independent sessions can live in one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    game_id: GameId,
    instance: Option<String>,
    player_id: Option<PlayerId>,
}

impl Identity {
    /// Creates an identity in `namespace` with no instance and no seat,
    /// so the session key is `"<namespace>:default"`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the namespace cannot
    /// form a session key (empty, or containing `:`).
    pub fn new(namespace: &str) -> Result<Self, ProtocolError> {
        Ok(Self {
            game_id: GameId::compose(namespace, None)?,
            instance: None,
            player_id: None,
        })
    }

    /// Sets the game instance and recomputes the session key.
    pub fn set_game_instance(&mut self, instance: Option<String>) {
        self.game_id = self.game_id.with_instance(instance.as_deref());
        self.instance = instance;
    }

    /// Sets the seat. The session key is unchanged.
    pub fn set_player(&mut self, player_id: Option<PlayerId>) {
        self.player_id = player_id;
    }

    /// The composite session key.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// The seat, if one has been assigned.
    pub fn player_id(&self) -> Option<&PlayerId> {
        self.player_id.as_ref()
    }

    pub fn namespace(&self) -> &str {
        self.game_id.namespace()
    }

    /// The explicitly chosen instance, `None` when on the default one.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }
}
