//! Peer records and node-name generation.
//!
//! Nodes pick a nickname from a fixed pool when they start, and pick a new
//! one when they find their name already in use by another node.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IndexedRandom;

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

/// A node this one has heard announce itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// The name the node announced.
    pub name: String,
    /// The most recent cycle in which the node was heard.
    pub last_seen_cycle: u64,
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Nicknames new nodes draw from.
pub const NODE_NAMES: &[&str] = &[
    "Donut", "Penguin", "Stumpy", "Whicker", "Howard", "Wilshire", "Disco",
    "Jack", "Bear", "Sneak", "Wisp", "Crazy", "Goat", "Pirate", "Hambone",
    "Walla", "Snake", "Caboose", "Sleepy", "Stompy", "Mopey", "Dopey",
    "Weasel", "Ghost", "Dasher", "Grumpy", "Hollywood", "Noodle", "Cupid",
    "Abraham", "Prancer", "Blinky", "Bonobo", "Banana", "Cinnabon",
];

/// Picks a random node name not in `taken`.
pub fn random_name(taken: &BTreeSet<String>) -> String {
    random_name_with(&mut rand::rng(), taken)
}

/// Like [`random_name`], drawing from the given RNG.
///
/// Prefers an unused name from [`NODE_NAMES`]. Once every pool name is
/// taken, appends a three-digit suffix to a random pool name until the
/// result is free.
pub fn random_name_with<R: Rng + ?Sized>(
    rng: &mut R,
    taken: &BTreeSet<String>,
) -> String {
    let free: Vec<&str> = NODE_NAMES
        .iter()
        .copied()
        .filter(|name| !taken.contains(*name))
        .collect();

    if let Some(name) = free.choose(rng) {
        return (*name).to_string();
    }

    loop {
        let base = NODE_NAMES[rng.random_range(0..NODE_NAMES.len())];
        let candidate = format!("{base}{}", rng.random_range(100..1000));
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}
