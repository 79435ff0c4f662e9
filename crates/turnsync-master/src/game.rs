//! The `Game` trait: the reducer the master runs actions through.

use serde_json::Value;
use turnsync_protocol::{Action, PlayerId};

/// Game rules, as seen by the master.
///
/// The state is the opaque payload of a
/// [`GameState`](turnsync_protocol::GameState); the master wraps it with
/// the version counter, so implementations never touch versions.
pub trait Game: Send + Sync + 'static {
    /// Builds the initial payload for a game with `num_players` seats.
    ///
    /// Called the first time any client syncs a game the master has not
    /// seen.
    fn setup(num_players: usize) -> Value;

    /// Checks an action before it is applied. Default: accept all.
    fn validate(
        _state: &Value,
        _player: Option<&PlayerId>,
        _action: &Action,
    ) -> Result<(), String> {
        Ok(())
    }

    /// Applies a validated action.
    fn apply(state: &mut Value, player: Option<&PlayerId>, action: &Action);
}
