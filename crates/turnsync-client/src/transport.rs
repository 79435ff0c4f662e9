//! The client transport: forwards actions, reconciles pushed state.
//!
//! [`Transport`] binds an [`Identity`], the [version guard](crate::guard)
//! and a [`Replica`](crate::Replica) to a [`Master`]. It is the only place
//! where stale or misdirected state is filtered out.
//!
//! ## Connection state machine
//!
//! ```text
//!                 connect()                link up
//! Disconnected ─────────────▶ Connecting ─────────▶ Connected
//!      ▲                          ▲                     │
//!      │ disconnect()             └──── link lost ──────┤
//!      └────────────────────────────────────────────────┘
//! ```
//!
//! An in-process master reports its link as up immediately, so `connect()`
//! goes straight to `Connected`. A network peer stays in `Connecting`
//! until its socket is established, and drops back to it when the socket
//! is lost.
//!
//! ## Inbound path
//!
//! ```text
//! ServerMessage ─▶ session-key filter ─▶ version guard ─▶ replica.dispatch
//!                        │ mismatch            │ stale
//!                        ▼                     ▼
//!                      drop                  drop
//! ```

use tokio::sync::mpsc;
use turnsync_protocol::{Action, GameId, GameState, PlayerId, ServerMessage};

use crate::guard::{self, Mode};
use crate::{
    ClientConfig, ClientError, ClientId, Identity, Link, LinkState, Master,
    ReplicaAction, SharedReplica,
};

/// Where the client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What happened to one inbound state.
///
/// Informational only: every variant other than `Yes` is a silent drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Dispatched into the replica.
    Yes,
    /// Targeted a session key other than ours.
    Misdirected,
    /// Failed the version guard.
    Stale,
    /// No replica is installed.
    NoReplica,
}

/// The client half of the synchronization protocol.
pub struct Transport<M: Master> {
    master: M,
    identity: Identity,
    num_players: usize,
    client: ClientId,
    state: ConnectionState,
    /// Link epoch the last baseline sync was requested for.
    synced_epoch: Option<u64>,
    replica: Option<SharedReplica>,
    inbound_tx: mpsc::UnboundedSender<ServerMessage>,
    inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl<M: Master> Transport<M> {
    /// Creates a disconnected transport on `config.namespace`'s default
    /// instance, with no seat and no replica.
    ///
    /// # Errors
    /// Returns [`ClientError::Protocol`] if the namespace cannot form a
    /// session key, or [`ClientError::InvalidConfig`] for zero seats.
    pub fn new(master: M, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let identity = Identity::new(&config.namespace)?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Ok(Self {
            master,
            identity,
            num_players: config.num_players,
            client: ClientId::next(),
            state: ConnectionState::Disconnected,
            synced_epoch: None,
            replica: None,
            inbound_tx,
            inbound_rx,
        })
    }

    /// Installs (or removes) the replica. Takes effect for the next
    /// inbound message.
    pub fn set_replica(&mut self, replica: Option<SharedReplica>) {
        self.replica = replica;
    }

    /// Builder-style [`set_replica`](Self::set_replica).
    #[must_use]
    pub fn with_replica(mut self, replica: SharedReplica) -> Self {
        self.replica = Some(replica);
        self
    }

    pub fn replica(&self) -> Option<&SharedReplica> {
        self.replica.as_ref()
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn client_id(&self) -> ClientId {
        self.client
    }

    /// The current composite session key.
    pub fn game_id(&self) -> &GameId {
        self.identity.game_id()
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        self.identity.player_id()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    // -----------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------

    /// Attaches to the master. No effect if already connected.
    ///
    /// Reaching `Connected` requests one baseline sync for the current
    /// identity.
    pub fn connect(&mut self) {
        if self.state == ConnectionState::Connected {
            return;
        }
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
            tracing::info!(
                client = %self.client,
                game_id = %self.identity.game_id(),
                "connecting to master"
            );
        }
        let link = self.master.attach(self.link());
        self.refresh_link(link);
    }

    /// Detaches from the master. Actions are no longer forwarded.
    ///
    /// Messages already in flight are still processed by [`poll`](Self::poll)
    /// and still go through the session-key filter.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.master.detach(self.client);
        self.state = ConnectionState::Disconnected;
        self.synced_epoch = None;
        tracing::info!(client = %self.client, "disconnected from master");
    }

    /// Picks up link changes and drains inbound messages in delivery
    /// order. Returns how many messages were processed.
    pub fn poll(&mut self) -> usize {
        if self.state != ConnectionState::Disconnected {
            let link = self.master.link_state();
            self.refresh_link(link);
        }

        let mut processed = 0;
        while let Ok(msg) = self.inbound_rx.try_recv() {
            self.handle(msg);
            processed += 1;
        }
        processed
    }

    /// Routes one pushed message to [`on_update`](Self::on_update) or
    /// [`on_sync`](Self::on_sync).
    pub fn handle(&self, msg: ServerMessage) -> Applied {
        match msg {
            ServerMessage::Update { game_id, state } => {
                self.on_update(&game_id, state)
            }
            ServerMessage::Sync { game_id, state } => {
                self.on_sync(&game_id, state)
            }
        }
    }

    fn refresh_link(&mut self, link: LinkState) {
        match link {
            LinkState::Down => {
                if self.state == ConnectionState::Connected {
                    tracing::warn!(client = %self.client, "link to master lost");
                    self.state = ConnectionState::Connecting;
                }
            }
            LinkState::Up(epoch) => {
                let fresh = self.state != ConnectionState::Connected
                    || self.synced_epoch != Some(epoch);
                if fresh {
                    self.state = ConnectionState::Connected;
                    self.synced_epoch = Some(epoch);
                    tracing::info!(
                        client = %self.client,
                        epoch,
                        "connected to master"
                    );
                    self.request_sync();
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------

    /// Forwards `action` to the master against `local`'s version.
    ///
    /// Never touches the replica: it changes only when the master's
    /// resulting update or sync arrives. Dropped while not connected, and
    /// for client-only actions.
    pub fn on_action(&self, local: &GameState, action: &Action) {
        if action.client_only {
            tracing::debug!(kind = %action.kind, "client-only action not forwarded");
            return;
        }
        if self.state != ConnectionState::Connected {
            tracing::debug!(
                kind = %action.kind,
                state = ?self.state,
                "not connected, dropping action"
            );
            return;
        }
        self.master.on_update(
            action,
            local.version,
            self.identity.game_id(),
            self.identity.player_id(),
        );
    }

    // -----------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------

    /// Applies an incremental update if it targets this session and is
    /// strictly newer than the replica.
    pub fn on_update(&self, game_id: &GameId, state: GameState) -> Applied {
        self.reconcile(game_id, state, Mode::Update)
    }

    /// Applies a snapshot if it targets this session and is not older
    /// than the replica.
    pub fn on_sync(&self, game_id: &GameId, state: GameState) -> Applied {
        self.reconcile(game_id, state, Mode::Sync)
    }

    fn reconcile(&self, game_id: &GameId, state: GameState, mode: Mode) -> Applied {
        // The filter uses the identity as of now, not as of sending, so
        // answers addressed to a previous identity fall out here.
        if game_id != self.identity.game_id() {
            tracing::debug!(
                target_game = %game_id,
                game_id = %self.identity.game_id(),
                ?mode,
                "misdirected message dropped"
            );
            return Applied::Misdirected;
        }

        let Some(replica) = &self.replica else {
            tracing::debug!(?mode, "no replica installed, message dropped");
            return Applied::NoReplica;
        };

        let current = replica.borrow().state().version;
        if !guard::accept(state.version, current, mode) {
            tracing::debug!(
                incoming = state.version,
                current,
                ?mode,
                "stale message dropped"
            );
            return Applied::Stale;
        }

        let action = match mode {
            Mode::Update => ReplicaAction::Update(state),
            Mode::Sync => ReplicaAction::Sync(state),
        };
        replica.borrow_mut().dispatch(action);
        Applied::Yes
    }

    // -----------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------

    /// Switches to another game instance in the same namespace.
    ///
    /// Resets the replica, then asks the master for the new instance's
    /// state. While connected the client re-attaches first so the answer
    /// can reach it; connecting later requests a baseline sync again.
    pub fn update_game_id(&mut self, instance: Option<String>) {
        self.identity.set_game_instance(instance);
        tracing::info!(
            client = %self.client,
            game_id = %self.identity.game_id(),
            "game id changed"
        );
        self.resync();
    }

    /// Switches seats. Same reset-then-resync sequence as
    /// [`update_game_id`](Self::update_game_id).
    pub fn update_player_id(&mut self, player_id: Option<PlayerId>) {
        self.identity.set_player(player_id);
        tracing::info!(
            client = %self.client,
            player_id = ?self.identity.player_id(),
            "player id changed"
        );
        self.resync();
    }

    fn resync(&mut self) {
        if let Some(replica) = &self.replica {
            replica.borrow_mut().dispatch(ReplicaAction::Reset);
        }
        if self.state == ConnectionState::Connected {
            self.master.attach(self.link());
        }
        self.request_sync();
    }

    fn request_sync(&self) {
        self.master.on_sync(
            self.identity.game_id(),
            self.identity.player_id(),
            self.num_players,
        );
    }

    fn link(&self) -> Link {
        Link {
            client: self.client,
            game_id: self.identity.game_id().clone(),
            player_id: self.identity.player_id().cloned(),
            inbound: self.inbound_tx.clone(),
        }
    }
}

impl<M: Master> Drop for Transport<M> {
    fn drop(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.master.detach(self.client);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::{Replica, Store};

    /// A master that accepts everything and remembers nothing but the
    /// attached inbound channel, with a switchable link.
    #[derive(Default)]
    struct FlakyMaster {
        link: Cell<Option<LinkState>>,
        syncs: Cell<usize>,
        inbound: RefCell<Option<crate::InboundSender>>,
    }

    impl FlakyMaster {
        fn set_link(&self, link: LinkState) {
            self.link.set(Some(link));
        }
    }

    impl Master for FlakyMaster {
        fn attach(&self, link: Link) -> LinkState {
            *self.inbound.borrow_mut() = Some(link.inbound);
            self.link_state()
        }

        fn detach(&self, _client: ClientId) {
            self.inbound.borrow_mut().take();
        }

        fn link_state(&self) -> LinkState {
            self.link.get().unwrap_or(LinkState::Up(0))
        }

        fn on_update(&self, _: &Action, _: u64, _: &GameId, _: Option<&PlayerId>) {}

        fn on_sync(&self, _: &GameId, _: Option<&PlayerId>, _: usize) {
            self.syncs.set(self.syncs.get() + 1);
        }
    }

    fn transport() -> (Transport<Rc<FlakyMaster>>, Rc<FlakyMaster>) {
        let master = Rc::new(FlakyMaster::default());
        let transport =
            Transport::new(Rc::clone(&master), ClientConfig::default()).unwrap();
        (transport, master)
    }

    #[test]
    fn test_new_rejects_empty_namespace() {
        let result = Transport::new(FlakyMaster::default(), ClientConfig::new(""));
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (mut t, master) = transport();
        t.connect();
        t.connect();
        assert_eq!(t.state(), ConnectionState::Connected);
        assert_eq!(master.syncs.get(), 1);
    }

    #[test]
    fn test_connect_waits_for_link() {
        let (mut t, master) = transport();
        master.set_link(LinkState::Down);
        t.connect();
        assert_eq!(t.state(), ConnectionState::Connecting);
        assert_eq!(master.syncs.get(), 0);

        master.set_link(LinkState::Up(1));
        t.poll();
        assert_eq!(t.state(), ConnectionState::Connected);
        assert_eq!(master.syncs.get(), 1);
    }

    #[test]
    fn test_lost_link_reenters_connecting_and_resyncs_on_new_epoch() {
        let (mut t, master) = transport();
        master.set_link(LinkState::Up(1));
        t.connect();

        master.set_link(LinkState::Down);
        t.poll();
        assert_eq!(t.state(), ConnectionState::Connecting);

        master.set_link(LinkState::Up(2));
        t.poll();
        assert_eq!(t.state(), ConnectionState::Connected);
        assert_eq!(master.syncs.get(), 2);
    }

    #[test]
    fn test_epoch_change_between_polls_triggers_resync() {
        let (mut t, master) = transport();
        master.set_link(LinkState::Up(1));
        t.connect();
        master.set_link(LinkState::Up(2));
        t.poll();
        assert_eq!(master.syncs.get(), 2);
        t.poll();
        assert_eq!(master.syncs.get(), 2);
    }

    #[test]
    fn test_disconnect_detaches_and_stops_following_link() {
        let (mut t, master) = transport();
        t.connect();
        t.disconnect();
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert!(master.inbound.borrow().is_none());

        t.poll();
        assert_eq!(t.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_poll_applies_inbound_in_delivery_order() {
        let (mut t, master) = transport();
        let store = Store::default().shared();
        t.set_replica(Some(store.clone()));
        t.connect();

        let game_id = t.game_id().clone();
        let inbound = master.inbound.borrow().clone().unwrap();
        for version in [0, 2, 1, 3] {
            inbound
                .send(ServerMessage::Update {
                    game_id: game_id.clone(),
                    state: GameState::new(version, json!(version)),
                })
                .unwrap();
        }

        assert_eq!(t.poll(), 4);
        // 0 and 1 are stale when they arrive; 2 then 3 land.
        assert_eq!(store.borrow().state(), &GameState::new(3, json!(3)));
        assert_eq!(store.borrow().dispatched(), 2);
    }

    #[test]
    fn test_no_replica_drops_inbound() {
        let (t, _master) = transport();
        let applied = t.on_sync(&GameId::from("default:default"), GameState::default());
        assert_eq!(applied, Applied::NoReplica);
    }

    #[test]
    fn test_drop_detaches_connected_client() {
        let (mut t, master) = transport();
        t.connect();
        assert!(master.inbound.borrow().is_some());
        drop(t);
        assert!(master.inbound.borrow().is_none());
    }
}
