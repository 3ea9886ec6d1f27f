//! Peer presence tracking for serimesh.
//!
//! This crate answers "who is in range?" on a shared serial line:
//!
//! 1. **Presence** — nodes announce themselves every cycle; the
//!    [`PeerTable`] remembers who was heard in the last two cycles.
//! 2. **Naming** — a node's own identity is a nickname drawn from
//!    [`NODE_NAMES`] ([`random_name`]), redrawn on collision.
//!
//! # How it fits in the stack
//!
//! ```text
//! Engine (above)      ← feeds NAME fields in, rolls cycles over, checks collisions
//!     ↕
//! Peers (this crate)  ← two-generation presence table, name pool
//! ```

mod names;
mod table;

pub use names::{NODE_NAMES, Peer, random_name, random_name_with};
pub use table::PeerTable;
