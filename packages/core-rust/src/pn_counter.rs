//! PN-Counter (Positive-Negative Counter) CRDT implementation.
//!
//! `PNCounter` is a grow/shrink counter that converges without coordination:
//! each node tracks its own increment and decrement totals, and merging two
//! counters takes the elementwise maximum of every node's contribution. The
//! counter's value is always `sum(increments) - sum(decrements)`.
//!
//! Unlike [`crate::lww_map::LWWMap`] and [`crate::or_map::ORMap`], a
//! PN-Counter has no per-key structure: the whole counter is one CRDT value,
//! so its [`MerkleTree`] digest is a single bucket keyed by node id rather
//! than by application key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hash::fnv1a_hash;
use crate::hlc::HLC;
use crate::merkle::MerkleTree;

/// A grow/shrink-only distributed counter.
///
/// Each node maintains its own monotonically increasing `p` (positive) and
/// `n` (negative) totals. The counter's value never depends on delivery
/// order or duplicate delivery: re-merging the same state is a no-op.
pub struct PNCounter {
    node_id: String,
    p: HashMap<String, u64>,
    n: HashMap<String, u64>,
    hlc: HLC,
    merkle_tree: MerkleTree,
}

/// Wire-format snapshot of a [`PNCounter`], for sync/gossip transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PNCounterSnapshot {
    pub p: HashMap<String, u64>,
    pub n: HashMap<String, u64>,
}

impl PNCounter {
    /// Creates a new counter at zero, local to the HLC's node id.
    #[must_use]
    pub fn new(hlc: HLC) -> Self {
        let node_id = hlc.node_id().to_string();
        Self {
            node_id,
            p: HashMap::new(),
            n: HashMap::new(),
            hlc,
            merkle_tree: MerkleTree::default_depth(),
        }
    }

    /// Increments this node's positive total by `amount` and returns the new value.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is negative.
    pub fn increment(&mut self, amount: u64) -> i64 {
        *self.p.entry(self.node_id.clone()).or_insert(0) += amount;
        self.update_merkle();
        self.value()
    }

    /// Increments this node's negative total by `amount` and returns the new value.
    pub fn decrement(&mut self, amount: u64) -> i64 {
        *self.n.entry(self.node_id.clone()).or_insert(0) += amount;
        self.update_merkle();
        self.value()
    }

    /// Applies a signed delta (positive increments, negative decrements) and
    /// returns the new value. Mirrors the wire-level `CounterRequest` delta field.
    pub fn add_and_get(&mut self, delta: i64) -> i64 {
        if delta >= 0 {
            self.increment(delta.unsigned_abs())
        } else {
            self.decrement(delta.unsigned_abs())
        }
    }

    /// Returns the current value: `sum(p) - sum(n)`.
    #[must_use]
    pub fn value(&self) -> i64 {
        let total_p: u64 = self.p.values().sum();
        let total_n: u64 = self.n.values().sum();
        i64::try_from(total_p).unwrap_or(i64::MAX) - i64::try_from(total_n).unwrap_or(i64::MAX)
    }

    /// Merges another counter's state into this one.
    ///
    /// Per node, keeps the maximum of the two `p`/`n` totals. Since every
    /// node's own total is monotonically non-decreasing, this converges
    /// regardless of merge order or duplicate merges.
    pub fn merge(&mut self, other: &PNCounter) {
        for (node, &amount) in &other.p {
            let entry = self.p.entry(node.clone()).or_insert(0);
            *entry = (*entry).max(amount);
        }
        for (node, &amount) in &other.n {
            let entry = self.n.entry(node.clone()).or_insert(0);
            *entry = (*entry).max(amount);
        }
        self.update_merkle();
    }

    /// Merges a remote snapshot received over the wire.
    pub fn merge_snapshot(&mut self, snapshot: PNCounterSnapshot) {
        for (node, amount) in snapshot.p {
            let entry = self.p.entry(node).or_insert(0);
            *entry = (*entry).max(amount);
        }
        for (node, amount) in snapshot.n {
            let entry = self.n.entry(node).or_insert(0);
            *entry = (*entry).max(amount);
        }
        self.update_merkle();
    }

    /// Produces a wire-format snapshot of this counter's full state.
    #[must_use]
    pub fn snapshot(&self) -> PNCounterSnapshot {
        PNCounterSnapshot {
            p: self.p.clone(),
            n: self.n.clone(),
        }
    }

    /// Returns the `MerkleTree` digest for anti-entropy comparison.
    #[must_use]
    pub fn merkle_tree(&self) -> &MerkleTree {
        &self.merkle_tree
    }

    /// Updates the Merkle digest for this node's own bucket.
    ///
    /// Each node's contribution is hashed independently so the root converges
    /// regardless of gossip order, matching the per-key update pattern in
    /// `LWWMap`/`ORMap`.
    fn update_merkle(&mut self) {
        let local_p = self.p.get(&self.node_id).copied().unwrap_or(0);
        let local_n = self.n.get(&self.node_id).copied().unwrap_or(0);
        let hash_input = format!("{}:{}:{}", self.node_id, local_p, local_n);
        let item_hash = fnv1a_hash(&hash_input);
        self.merkle_tree.update(&self.node_id, item_hash);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use super::*;
    use crate::hlc::ClockSource;

    struct FixedClock {
        time: Arc<AtomicU64>,
    }

    impl FixedClock {
        fn new(initial: u64) -> Self {
            Self { time: Arc::new(AtomicU64::new(initial)) }
        }
    }

    impl ClockSource for FixedClock {
        fn now(&self) -> u64 {
            self.time.load(AtomicOrdering::Relaxed)
        }
    }

    fn make_counter(node_id: &str) -> PNCounter {
        let hlc = HLC::new(node_id.to_string(), Box::new(FixedClock::new(1_000_000)));
        PNCounter::new(hlc)
    }

    #[test]
    fn starts_at_zero() {
        let counter = make_counter("node-a");
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn increment_and_decrement() {
        let mut counter = make_counter("node-a");
        assert_eq!(counter.increment(10), 10);
        assert_eq!(counter.decrement(3), 7);
    }

    #[test]
    fn add_and_get_handles_sign() {
        let mut counter = make_counter("node-a");
        assert_eq!(counter.add_and_get(5), 5);
        assert_eq!(counter.add_and_get(-2), 3);
    }

    #[test]
    fn merge_combines_distinct_nodes() {
        let mut a = make_counter("node-a");
        let mut b = make_counter("node-b");
        a.increment(5);
        b.increment(7);
        a.merge(&b);
        assert_eq!(a.value(), 12);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = make_counter("node-a");
        let mut b = make_counter("node-b");
        b.increment(7);
        a.merge(&b);
        let value_after_first = a.value();
        a.merge(&b);
        assert_eq!(a.value(), value_after_first);
    }

    #[test]
    fn merge_takes_max_not_sum_on_replay() {
        let mut a = make_counter("node-a");
        let mut b = make_counter("node-b");
        b.increment(7);
        let snapshot = b.snapshot();
        a.merge_snapshot(snapshot.clone());
        a.merge_snapshot(snapshot);
        assert_eq!(a.value(), 7);
    }

    #[test]
    fn merge_is_commutative() {
        let mut a = make_counter("node-a");
        a.increment(3);
        let mut b = make_counter("node-b");
        b.increment(4);

        let mut order1 = make_counter("node-c");
        order1.merge(&a);
        order1.merge(&b);

        let mut order2 = make_counter("node-c");
        order2.merge(&b);
        order2.merge(&a);

        assert_eq!(order1.value(), order2.value());
    }

    #[test]
    fn snapshot_roundtrips_through_msgpack() {
        let mut counter = make_counter("node-a");
        counter.increment(9);
        counter.decrement(2);
        let snapshot = counter.snapshot();
        let bytes = rmp_serde::to_vec_named(&snapshot).expect("serialize");
        let decoded: PNCounterSnapshot = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(decoded.p, snapshot.p);
        assert_eq!(decoded.n, snapshot.n);
    }

    #[test]
    fn merkle_root_changes_on_write() {
        let mut counter = make_counter("node-a");
        let before = counter.merkle_tree().get_root_hash();
        counter.increment(1);
        assert_ne!(before, counter.merkle_tree().get_root_hash());
    }

    #[test]
    fn merkle_roots_converge_after_merge() {
        let mut a = make_counter("node-a");
        let mut b = make_counter("node-b");
        a.increment(5);
        b.increment(7);

        a.merge(&b);
        b.merge(&a);

        assert_eq!(a.merkle_tree().get_root_hash(), b.merkle_tree().get_root_hash());
    }
}
