//! The master's core: canonical game states and who is listening.
//!
//! `MasterState` does no I/O and no locking. [`LocalMaster`](crate::LocalMaster)
//! wraps it in a `RefCell` for single-threaded use; the
//! [`MasterServer`](crate::MasterServer) wraps it in a Tokio `Mutex`
//! shared by every connection task.

use std::collections::HashMap;
use std::marker::PhantomData;

use turnsync_client::{ClientId, InboundSender};
use turnsync_protocol::{Action, GameId, GameState, PlayerId, ServerMessage};

use crate::{Game, Rejection};

/// One attached client.
struct Subscriber {
    game_id: GameId,
    player_id: Option<PlayerId>,
    outbound: InboundSender,
}

/// Canonical game states plus the subscriber registry.
///
/// ## Lifetime
///
/// A game lives until [`remove_game`](Self::remove_game) is called for it,
/// even after its last subscriber leaves, so a client re-dialing after a
/// dropped link finds its game intact. Any sync naming a new id creates a
/// game: hosts exposed to untrusted clients should remove finished games.
///
/// ## Versioning
///
/// A game is created at version 0 by the first sync that names it. Every
/// applied action bumps the version by exactly one. An action is only
/// applied if the client sent it against the current version, so two
/// clients racing on the same version cannot both win.
pub struct MasterState<G: Game> {
    games: HashMap<GameId, GameState>,
    subscribers: HashMap<ClientId, Subscriber>,
    _game: PhantomData<fn() -> G>,
}

impl<G: Game> MasterState<G> {
    /// Creates a master with no games and no subscribers.
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
            subscribers: HashMap::new(),
            _game: PhantomData,
        }
    }

    /// Registers `client`, replacing any earlier registration.
    pub fn attach(
        &mut self,
        client: ClientId,
        game_id: GameId,
        player_id: Option<PlayerId>,
        outbound: InboundSender,
    ) {
        tracing::debug!(%client, %game_id, ?player_id, "subscriber attached");
        self.subscribers.insert(
            client,
            Subscriber {
                game_id,
                player_id,
                outbound,
            },
        );
    }

    /// Removes `client`. Returns whether it was attached.
    pub fn detach(&mut self, client: ClientId) -> bool {
        let removed = self.subscribers.remove(&client).is_some();
        if removed {
            tracing::debug!(%client, "subscriber detached");
        }
        removed
    }

    /// Sends the full state of `game_id` to every subscriber attached with
    /// this `(game_id, player_id)`, creating the game first if needed.
    pub fn on_sync(
        &mut self,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
        num_players: usize,
    ) {
        let state = self.games.entry(game_id.clone()).or_insert_with(|| {
            tracing::info!(%game_id, num_players, "game created");
            GameState::new(0, G::setup(num_players))
        });
        let msg = ServerMessage::Sync {
            game_id: game_id.clone(),
            state: state.clone(),
        };

        for sub in self.subscribers.values() {
            if &sub.game_id == game_id && sub.player_id.as_ref() == player_id {
                let _ = sub.outbound.send(msg.clone());
            }
        }
    }

    /// Validates and applies `action`, then broadcasts the new state.
    ///
    /// The update goes to every subscriber following `game_id`, whatever
    /// seat it holds. Returns the new version.
    pub fn on_update(
        &mut self,
        action: &Action,
        version: u64,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
    ) -> Result<u64, Rejection> {
        if action.client_only {
            return Err(Rejection::ClientOnly(action.kind.clone()));
        }
        let state = self
            .games
            .get_mut(game_id)
            .ok_or_else(|| Rejection::UnknownGame(game_id.clone()))?;
        if state.version != version {
            return Err(Rejection::StaleVersion {
                current: state.version,
                sent: version,
            });
        }
        G::validate(&state.payload, player_id, action).map_err(Rejection::Invalid)?;

        G::apply(&mut state.payload, player_id, action);
        state.version += 1;
        tracing::debug!(
            %game_id,
            ?player_id,
            kind = %action.kind,
            version = state.version,
            "action applied"
        );

        let msg = ServerMessage::Update {
            game_id: game_id.clone(),
            state: state.clone(),
        };
        let new_version = state.version;
        self.broadcast(game_id, &msg);
        Ok(new_version)
    }

    /// The canonical state of `game_id`, if it exists.
    pub fn game(&self, game_id: &GameId) -> Option<&GameState> {
        self.games.get(game_id)
    }

    /// Forgets `game_id`. Its subscribers stay attached; their next sync
    /// starts the game over from [`Game::setup`].
    pub fn remove_game(&mut self, game_id: &GameId) -> Option<GameState> {
        let removed = self.games.remove(game_id);
        if removed.is_some() {
            tracing::info!(%game_id, "game removed");
        }
        removed
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Sends to every subscriber of `game_id`. Closed channels are skipped.
    fn broadcast(&self, game_id: &GameId, msg: &ServerMessage) {
        for sub in self.subscribers.values() {
            if &sub.game_id == game_id {
                let _ = sub.outbound.send(msg.clone());
            }
        }
    }
}

impl<G: Game> Default for MasterState<G> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use super::*;

    /// Counts `INC` actions; refuses anything else.
    struct Counter;

    impl Game for Counter {
        fn setup(num_players: usize) -> Value {
            json!({ "count": 0, "seats": num_players })
        }

        fn validate(
            _state: &Value,
            _player: Option<&PlayerId>,
            action: &Action,
        ) -> Result<(), String> {
            if action.kind == "INC" {
                Ok(())
            } else {
                Err(format!("unknown action {}", action.kind))
            }
        }

        fn apply(state: &mut Value, _player: Option<&PlayerId>, _action: &Action) {
            let count = state["count"].as_u64().unwrap_or(0);
            state["count"] = json!(count + 1);
        }
    }

    fn key(instance: &str) -> GameId {
        GameId::compose("default", Some(instance)).unwrap()
    }

    fn inc() -> Action {
        Action::new("INC", Value::Null)
    }

    #[test]
    fn test_sync_creates_game_at_version_zero() {
        let mut master = MasterState::<Counter>::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        master.attach(ClientId::new(1), key("a"), None, tx);

        master.on_sync(&key("a"), None, 3);

        let msg = rx.try_recv().expect("sync delivered");
        assert_eq!(
            msg,
            ServerMessage::Sync {
                game_id: key("a"),
                state: GameState::new(0, json!({ "count": 0, "seats": 3 })),
            }
        );
    }

    #[test]
    fn test_sync_only_reaches_matching_seat() {
        let mut master = MasterState::<Counter>::new();
        let (tx0, mut rx0) = mpsc::unbounded_channel();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        master.attach(ClientId::new(1), key("a"), Some("0".into()), tx0);
        master.attach(ClientId::new(2), key("a"), Some("1".into()), tx1);

        master.on_sync(&key("a"), Some(&PlayerId::from("1")), 2);

        assert!(rx0.try_recv().is_err());
        assert!(rx1.try_recv().is_ok());
    }

    #[test]
    fn test_update_bumps_version_and_reaches_only_that_game() {
        let mut master = MasterState::<Counter>::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        master.attach(ClientId::new(1), key("a"), None, tx_a);
        master.attach(ClientId::new(2), key("b"), None, tx_b);
        master.on_sync(&key("a"), None, 2);
        let _ = rx_a.try_recv();

        assert_eq!(master.on_update(&inc(), 0, &key("a"), None), Ok(1));
        assert_eq!(master.game(&key("a")).unwrap().payload["count"], 1);

        let expected = ServerMessage::Update {
            game_id: key("a"),
            state: GameState::new(1, json!({ "count": 1, "seats": 2 })),
        };
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert!(rx_b.try_recv().is_err(), "other game's follower got the update");
    }

    #[test]
    fn test_update_reaches_every_seat_of_the_game() {
        let mut master = MasterState::<Counter>::new();
        let (tx0, mut rx0) = mpsc::unbounded_channel();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        master.attach(ClientId::new(1), key("a"), Some("0".into()), tx0);
        master.attach(ClientId::new(2), key("a"), Some("1".into()), tx1);
        master.on_sync(&key("a"), None, 2);

        master.on_update(&inc(), 0, &key("a"), Some(&PlayerId::from("0"))).unwrap();

        assert!(matches!(rx0.try_recv(), Ok(ServerMessage::Update { .. })));
        assert!(matches!(rx1.try_recv(), Ok(ServerMessage::Update { .. })));
    }

    #[test]
    fn test_game_outlives_subscribers_until_removed() {
        let mut master = MasterState::<Counter>::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        master.attach(ClientId::new(1), key("a"), None, tx);
        master.on_sync(&key("a"), None, 2);
        master.on_update(&inc(), 0, &key("a"), None).unwrap();
        master.detach(ClientId::new(1));
        assert_eq!(master.game(&key("a")).map(|g| g.version), Some(1));

        let removed = master.remove_game(&key("a"));
        assert_eq!(removed.map(|g| g.version), Some(1));
        assert_eq!(master.game_count(), 0);
        assert!(master.remove_game(&key("a")).is_none());

        master.on_sync(&key("a"), None, 2);
        assert_eq!(master.game(&key("a")).map(|g| g.version), Some(0));
    }

    #[test]
    fn test_update_against_old_version_is_rejected() {
        let mut master = MasterState::<Counter>::new();
        master.on_sync(&key("a"), None, 2);
        master.on_update(&inc(), 0, &key("a"), None).unwrap();

        assert_eq!(
            master.on_update(&inc(), 0, &key("a"), None),
            Err(Rejection::StaleVersion { current: 1, sent: 0 })
        );
        assert_eq!(master.game(&key("a")).unwrap().version, 1);
    }

    #[test]
    fn test_update_for_unknown_game_is_rejected() {
        let mut master = MasterState::<Counter>::new();
        assert_eq!(
            master.on_update(&inc(), 0, &key("nope"), None),
            Err(Rejection::UnknownGame(key("nope")))
        );
    }

    #[test]
    fn test_invalid_and_client_only_actions_are_rejected() {
        let mut master = MasterState::<Counter>::new();
        master.on_sync(&key("a"), None, 2);

        let bad = Action::new("DEC", Value::Null);
        assert!(matches!(
            master.on_update(&bad, 0, &key("a"), None),
            Err(Rejection::Invalid(_))
        ));
        assert_eq!(
            master.on_update(&Action::reset(), 0, &key("a"), None),
            Err(Rejection::ClientOnly("RESET".into()))
        );
        assert_eq!(master.game(&key("a")).unwrap().version, 0);
    }

    #[test]
    fn test_detach_stops_delivery_and_closed_channels_are_skipped() {
        let mut master = MasterState::<Counter>::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        drop(dead_rx);
        master.attach(ClientId::new(1), key("a"), None, tx);
        master.attach(ClientId::new(2), key("a"), None, dead_tx);

        assert!(master.detach(ClientId::new(1)));
        assert!(!master.detach(ClientId::new(1)));
        assert_eq!(master.subscriber_count(), 1);

        master.on_sync(&key("a"), None, 2);
        assert!(rx.try_recv().is_err());
    }
}
