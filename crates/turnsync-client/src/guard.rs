//! The version guard: may an incoming state overwrite the replica?
//!
//! The master stamps every state with a version that only grows. The
//! guard compares that stamp with the replica's current one:
//!
//! | mode | accepted when |
//! |---|---|
//! | [`Mode::Update`] | `incoming > current` |
//! | [`Mode::Sync`]   | `incoming >= current` |
//!
//! An update is an incremental notification, so a replayed or reordered
//! one must not clobber something newer. A sync is a snapshot the client
//! asked for, and must be able to establish a baseline at the same version
//! (the very first sync lands on 0 == 0).

/// Which rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Strictly newer only.
    Update,
    /// Newer or equal.
    Sync,
}

/// Returns `true` if a state at `incoming` may replace one at `current`.
pub fn accept(incoming: u64, current: u64, mode: Mode) -> bool {
    match mode {
        Mode::Update => incoming > current,
        Mode::Sync => incoming >= current,
    }
}
