//! # Turnsync
//!
//! Version-guarded state synchronization for turn-based web games.
//!
//! Each client holds a local replica of a game's state. Actions go to an
//! authoritative master, which applies them and pushes the result back
//! out. The client side filters what comes back by session key and
//! version, so a replica only ever moves forward and only ever shows the
//! game it is following.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use turnsync::prelude::*;
//!
//! # struct MyGame;
//! # impl Game for MyGame {
//! #     fn setup(_: usize) -> serde_json::Value { serde_json::Value::Null }
//! #     fn apply(_: &mut serde_json::Value, _: Option<&PlayerId>, _: &Action) {}
//! # }
//! let master = Rc::new(LocalMaster::<MyGame>::new());
//! let store = Store::default().shared();
//! let mut client = Transport::new(Rc::clone(&master), ClientConfig::default())?
//!     .with_replica(store.clone());
//! client.connect();
//! client.poll();
//! # Ok::<(), TurnsyncError>(())
//! ```

mod error;

pub use error::TurnsyncError;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{TurnsyncError, init_tracing};
    pub use turnsync_client::{
        Applied, ClientConfig, ConnectionState, Replica, ReplicaAction,
        SharedReplica, SocketConfig, SocketMaster, Store, Transport,
    };
    pub use turnsync_master::{
        Game, LocalMaster, MasterServer, MasterServerBuilder, Rejection,
    };
    pub use turnsync_protocol::{Action, GameId, GameState, PlayerId};
}
