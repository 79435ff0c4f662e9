//! The master endpoint, as seen from a client.
//!
//! The master is the authoritative peer. The client core reaches it only
//! through the [`Master`] trait, so the in-process reference master and
//! the network peer are interchangeable.
//!
//! # Direction of calls
//!
//! Outbound calls (`on_update`, `on_sync`) are fire-and-forget method
//! calls. Inbound traffic does not call back into the client: the master
//! pushes [`ServerMessage`]s into the channel registered with
//! [`Master::attach`], and the client drains it in delivery order.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use turnsync_protocol::{Action, GameId, PlayerId, ServerMessage};

/// Counter for generating process-unique client IDs.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one client to the master it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Allocates a fresh ID.
    pub fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an ID assigned elsewhere, e.g. a server-side connection id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Where the master delivers pushed messages for one client.
pub type InboundSender = mpsc::UnboundedSender<ServerMessage>;

/// A client's registration with a master.
#[derive(Debug, Clone)]
pub struct Link {
    pub client: ClientId,
    pub game_id: GameId,
    pub player_id: Option<PlayerId>,
    pub inbound: InboundSender,
}

/// Whether the path to the master is usable.
///
/// `Up` carries a link epoch: a network peer bumps it every time it
/// re-establishes a dropped link, which tells the client that the master
/// has forgotten it and a fresh sync is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up(u64),
}

impl LinkState {
    pub fn is_up(self) -> bool {
        matches!(self, Self::Up(_))
    }
}

/// The authoritative peer.
pub trait Master {
    /// Registers (or re-registers) a client and its inbound channel.
    ///
    /// Calling it again for the same [`ClientId`] replaces the previous
    /// registration. Returns the link state right after attaching.
    fn attach(&self, link: Link) -> LinkState;

    /// Forgets a client. Unknown ids are ignored.
    fn detach(&self, client: ClientId);

    /// Current link state. In-process masters are always up.
    fn link_state(&self) -> LinkState {
        LinkState::Up(0)
    }

    /// "Apply `action` to the state I hold at `version`."
    fn on_update(
        &self,
        action: &Action,
        version: u64,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
    );

    /// "Send me the full state of `game_id`."
    fn on_sync(
        &self,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
        num_players: usize,
    );
}

/// Lets several clients in one process share a master.
impl<M: Master + ?Sized> Master for Rc<M> {
    fn attach(&self, link: Link) -> LinkState {
        (**self).attach(link)
    }

    fn detach(&self, client: ClientId) {
        (**self).detach(client)
    }

    fn link_state(&self) -> LinkState {
        (**self).link_state()
    }

    fn on_update(
        &self,
        action: &Action,
        version: u64,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
    ) {
        (**self).on_update(action, version, game_id, player_id)
    }

    fn on_sync(
        &self,
        game_id: &GameId,
        player_id: Option<&PlayerId>,
        num_players: usize,
    ) {
        (**self).on_sync(game_id, player_id, num_players)
    }
}
