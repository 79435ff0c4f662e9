//! The local replica: the state container accepted states land in.
//!
//! The replica belongs to the caller (a UI store, a test harness). The
//! [`Transport`](crate::Transport) only holds a shared handle to it and
//! reads its version fresh on every inbound message, so the caller may
//! swap it out between messages.

use std::cell::RefCell;
use std::rc::Rc;

use turnsync_protocol::{Action, GameState};

/// What the transport asks a replica to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicaAction {
    /// An accepted incremental update.
    Update(GameState),
    /// An accepted full snapshot.
    Sync(GameState),
    /// Drop the current payload until the next sync arrives. Issued on
    /// every identity change; never forwarded to the master.
    Reset,
}

impl ReplicaAction {
    /// Whether this action exists only on the client.
    pub fn is_client_only(&self) -> bool {
        matches!(self, Self::Reset)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update(_) => "UPDATE",
            Self::Sync(_) => "SYNC",
            Self::Reset => Action::RESET,
        }
    }
}

/// A reducer-backed state container.
///
/// Implementors apply each [`ReplicaAction`] with their own reducer. The
/// transport only relies on `state().version` reflecting the last
/// accepted state.
pub trait Replica {
    /// Applies an action.
    fn dispatch(&mut self, action: ReplicaAction);

    /// The current snapshot.
    fn state(&self) -> &GameState;
}

/// The handle the transport holds. Single-threaded by construction: all
/// reconciliation runs serially on the host's event loop.
pub type SharedReplica = Rc<RefCell<dyn Replica>>;

/// A plain replica: updates and syncs replace the state, a reset restores
/// the state it was created with.
#[derive(Debug, Clone, Default)]
pub struct Store {
    initial: GameState,
    current: GameState,
    dispatched: usize,
}

impl Store {
    /// Creates a store whose current and reset state is `initial`.
    pub fn new(initial: GameState) -> Self {
        Self {
            current: initial.clone(),
            initial,
            dispatched: 0,
        }
    }

    /// Wraps the store in the handle a transport expects.
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Number of actions dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }
}

impl Replica for Store {
    fn dispatch(&mut self, action: ReplicaAction) {
        self.dispatched += 1;
        tracing::trace!(kind = action.kind(), "store dispatch");
        match action {
            ReplicaAction::Update(state) | ReplicaAction::Sync(state) => {
                self.current = state;
            }
            ReplicaAction::Reset => {
                self.current = self.initial.clone();
            }
        }
    }

    fn state(&self) -> &GameState {
        &self.current
    }
}
