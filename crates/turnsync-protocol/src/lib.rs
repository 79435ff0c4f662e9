//! Wire protocol for turnsync.
//!
//! This crate defines the vocabulary that clients and the master share:
//!
//! - **Identity** ([`GameId`], [`PlayerId`]): which game instance a
//!   message targets, and which seat sent it.
//! - **State** ([`GameState`], [`Action`]): the versioned snapshot the
//!   master owns and the opaque moves clients forward to it.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): the frames
//!   that travel between a client and the master.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or reconciliation. It
//! sits between the byte-level transport and the client core:
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage / ServerMessage) → Client core
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Action, ClientMessage, DEFAULT_INSTANCE, GameId, GameState, PlayerId,
    ServerMessage,
};
