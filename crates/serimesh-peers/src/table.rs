//! The peer table: which nodes are currently in range.
//!
//! Presence is measured in announcement cycles, not wall-clock time. The
//! table keeps two generations of sightings:
//!
//! - `current`: peers heard since the last [`PeerTable::end_cycle`]
//! - `previous`: peers heard in the cycle before that
//!
//! A peer is visible while it appears in either generation, so one missed
//! announcement does not drop it from view; two silent cycles in a row do.
//!
//! ```text
//! cycle N:    observe(A)   current={A}  previous={}
//! end N:      visible={A}  current={}   previous={A}
//! end N+1:    visible={A}  current={}   previous={}
//! end N+2:    visible={}
//! ```
//!
//! # Concurrency note
//!
//! `PeerTable` is not thread-safe by itself. The read path calls `observe`
//! and the announcement task calls `end_cycle`; the engine serializes them
//! behind one lock.

use std::collections::{BTreeSet, HashMap};

use crate::Peer;

/// Two-generation presence tracker.
#[derive(Debug, Default)]
pub struct PeerTable {
    current: HashMap<String, Peer>,
    previous: HashMap<String, Peer>,
    cycle: u64,
}

impl PeerTable {
    /// Creates an empty table at cycle 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `name` announced itself during `cycle`.
    ///
    /// Returns `true` if the peer was not visible before this sighting.
    /// Empty names are ignored.
    pub fn observe(&mut self, name: &str, cycle: u64) -> bool {
        if name.is_empty() {
            tracing::debug!("ignoring announcement with empty name");
            return false;
        }

        if let Some(peer) = self.current.get_mut(name) {
            peer.last_seen_cycle = peer.last_seen_cycle.max(cycle);
            return false;
        }

        let newly_visible = !self.previous.contains_key(name);
        self.current.insert(
            name.to_string(),
            Peer {
                name: name.to_string(),
                last_seen_cycle: cycle,
            },
        );

        if newly_visible {
            tracing::info!(peer = name, cycle, "peer discovered");
        }
        newly_visible
    }

    /// Closes the current cycle.
    ///
    /// Returns the visible set (`current ∪ previous`), then rotates:
    /// `previous := current`, `current := {}`. Peers only present in the
    /// old `previous` generation drop out here.
    pub fn end_cycle(&mut self) -> BTreeSet<String> {
        let visible = self.visible();

        let rotated_out = std::mem::take(&mut self.previous);
        self.previous = std::mem::take(&mut self.current);
        self.cycle += 1;

        for name in rotated_out.keys() {
            if !self.previous.contains_key(name) {
                tracing::debug!(peer = %name, "peer silent for two cycles");
            }
        }
        tracing::trace!(cycle = self.cycle, visible = visible.len(), "cycle ended");

        visible
    }

    /// Whether `name` is currently visible (heard this cycle or last).
    pub fn contains(&self, name: &str) -> bool {
        self.current.contains_key(name) || self.previous.contains_key(name)
    }

    /// The visible set, without rotating generations.
    pub fn visible(&self) -> BTreeSet<String> {
        self.current
            .keys()
            .chain(self.previous.keys())
            .cloned()
            .collect()
    }

    /// The number of the cycle currently in progress (starts at 0).
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Number of visible peers.
    pub fn len(&self) -> usize {
        self.current.len()
            + self
                .previous
                .keys()
                .filter(|name| !self.current.contains_key(*name))
                .count()
    }

    /// Returns `true` if no peer is visible.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = PeerTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert_eq!(table.cycle(), 0);
    }

    #[test]
    fn test_observe_reports_first_sighting_only() {
        let mut table = PeerTable::new();
        assert!(table.observe("Goat", 0));
        assert!(!table.observe("Goat", 0));
        assert!(table.contains("Goat"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_repeat_observation_bumps_last_seen() {
        let mut table = PeerTable::new();
        table.observe("Goat", 3);
        table.observe("Goat", 4);
        assert_eq!(table.current["Goat"].last_seen_cycle, 4);
    }

    #[test]
    fn test_peer_visible_for_two_cycles_then_gone() {
        let mut table = PeerTable::new();
        table.observe("Goat", 0);

        assert_eq!(table.end_cycle(), names(&["Goat"]));
        assert!(table.contains("Goat"));

        assert_eq!(table.end_cycle(), names(&["Goat"]));
        assert!(!table.contains("Goat"));

        assert!(table.end_cycle().is_empty());
    }

    #[test]
    fn test_reannouncement_keeps_peer_alive() {
        let mut table = PeerTable::new();
        for cycle in 0..10 {
            table.observe("Wisp", cycle);
            assert_eq!(table.end_cycle(), names(&["Wisp"]));
        }
        assert_eq!(table.cycle(), 10);
    }

    #[test]
    fn test_single_missed_cycle_is_smoothed_over() {
        let mut table = PeerTable::new();
        table.observe("Disco", 0);
        table.end_cycle();
        // Cycle 1: Disco is silent.
        assert_eq!(table.end_cycle(), names(&["Disco"]));
        // Cycle 2: Disco is back and counts as rediscovered.
        assert!(table.observe("Disco", 2));
        assert_eq!(table.end_cycle(), names(&["Disco"]));
    }

    #[test]
    fn test_peer_seen_last_cycle_not_reported_new() {
        let mut table = PeerTable::new();
        table.observe("Bear", 0);
        table.end_cycle();
        assert!(!table.observe("Bear", 1));
    }

    #[test]
    fn test_visible_is_union_of_generations() {
        let mut table = PeerTable::new();
        table.observe("A", 0);
        table.end_cycle();
        table.observe("B", 1);
        assert_eq!(table.visible(), names(&["A", "B"]));
        assert_eq!(table.len(), 2);

        table.observe("A", 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_empty_name_ignored() {
        let mut table = PeerTable::new();
        assert!(!table.observe("", 0));
        assert!(table.is_empty());
    }
}
