//! The authoritative side of turnsync.
//!
//! The master owns the canonical state of every game instance. Clients
//! forward actions; the master validates them against the game's rules,
//! bumps the version, and pushes the result back out.
//!
//! # Key types
//!
//! - [`Game`]: the reducer trait game developers implement
//! - [`MasterState`]: game store plus subscriber registry, no I/O
//! - [`LocalMaster`]: in-process master for local multiplayer and tests
//! - [`MasterServer`]: the same master behind a WebSocket listener
//! - [`Rejection`]: why an action was not applied

mod error;
mod game;
mod handler;
mod local;
mod server;
mod state;

pub use error::{MasterError, Rejection};
pub use game::Game;
pub use local::LocalMaster;
pub use server::{MasterServer, MasterServerBuilder};
pub use state::MasterState;
