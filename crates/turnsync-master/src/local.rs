//! The in-process reference master.
//!
//! `LocalMaster` runs the full master logic inside the client's process,
//! with no sockets: useful for hot-seat multiplayer and for tests. Share it
//! between clients with an `Rc`.

use std::cell::RefCell;

use turnsync_client::{ClientId, Link, LinkState, Master};
use turnsync_protocol::{Action, GameId, GameState, PlayerId};

use crate::{Game, MasterState};

/// A [`Master`] that lives in the same thread as its clients.
///
/// Pushed messages land in each client's inbound channel straight away;
/// clients see them on their next `poll()`.
pub struct LocalMaster<G: Game> {
    state: RefCell<MasterState<G>>,
}

impl<G: Game> LocalMaster<G> {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MasterState::new()),
        }
    }

    /// A copy of the canonical state of `game_id`, if it exists.
    pub fn game(&self, game_id: &GameId) -> Option<GameState> {
        self.state.borrow().game(game_id).cloned()
    }

    /// Forgets `game_id`, returning its last state.
    pub fn remove_game(&self, game_id: &GameId) -> Option<GameState> {
        self.state.borrow_mut().remove_game(game_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscriber_count()
    }
}

impl<G: Game> Default for LocalMaster<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Game> Master for LocalMaster<G> {
    fn attach(&self, link: Link) -> LinkState {
        self.state.borrow_mut().attach(
            link.client,
            link.game_id,
            link.player_id,
            link.inbound,
        );
        LinkState::Up(0)
    }

    fn detach(&self, client: ClientId) {
        self.state.borrow_mut().detach(client);
    }

    fn on_update(
        &self,
        action: &Action,
        version: u64,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
    ) {
        let result = self
            .state
            .borrow_mut()
            .on_update(action, version, game_id, player_id);
        if let Err(reason) = result {
            tracing::debug!(%game_id, ?player_id, %reason, "action rejected");
        }
    }

    fn on_sync(
        &self,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
        num_players: usize,
    ) {
        self.state
            .borrow_mut()
            .on_sync(game_id, player_id, num_players);
    }
}
