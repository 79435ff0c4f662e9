//! Client-side transport and reconciliation for turnsync.
//!
//! A single authoritative master owns every game's state. Each client
//! keeps a local replica and must stay convergent with the master. This
//! crate is the layer in between:
//!
//! 1. **Identity** ([`Identity`]): which game instance and which seat
//!    this client is, folded into the composite session key.
//! 2. **Version guard** ([`guard`]): whether an incoming state may
//!    overwrite the replica.
//! 3. **Replica** ([`Replica`], [`Store`]): the externally owned state
//!    container that accepted states are dispatched into.
//! 4. **Transport** ([`Transport`]): forwards local actions to a
//!    [`Master`] and reconciles whatever the master pushes back.
//!
//! # How it fits in the stack
//!
//! ```text
//! UI / game loop  ── on_action ──▶  Transport  ── on_update / on_sync ──▶  Master
//!      ▲                              │    ▲                                  │
//!      └──── Replica (dispatch) ◀─────┘    └──── ServerMessage (inbound) ◀────┘
//! ```
//!
//! Every rejection on the inbound path (wrong session key, stale version)
//! is a silent drop, logged at `debug`, never an error.

mod config;
mod error;
pub mod guard;
mod identity;
mod master;
mod replica;
mod socket;
mod transport;

pub use config::{ClientConfig, SocketConfig};
pub use error::ClientError;
pub use guard::Mode;
pub use identity::Identity;
pub use master::{ClientId, InboundSender, Link, LinkState, Master};
pub use replica::{Replica, ReplicaAction, SharedReplica, Store};
pub use socket::SocketMaster;
pub use transport::{Applied, ConnectionState, Transport};
