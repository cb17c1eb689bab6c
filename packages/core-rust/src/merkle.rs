//! MerkleTree and `ORMapMerkleTree` for efficient delta synchronization.
//!
//! Both trees use a prefix trie structure keyed by hex digits of the FNV-1a hash
//! of entry keys. The trie depth (default 3) determines bucket granularity.
//! Nodes compare root hashes to identify differing subtrees, then walk down
//! to discover the specific keys that need synchronization.

use std::collections::HashMap;

use crate::hash::{combine_hashes, fnv1a_hash};

/// Default bucket depth for both [`MerkleTree`] and [`ORMapMerkleTree`].
///
/// A depth of 3 routes each key through 3 hex-digit buckets (4096 leaf
/// buckets), balancing delta-sync granularity against tree size for
/// maps in the thousands-to-low-millions-of-keys range. Configurable via
/// `ServerConfig::merkle_bucket_depth`.
pub const DEFAULT_DEPTH: u32 = 3;

/// A node in a bucketed Merkle trie.
///
/// Each node sums the hashes of its children (or, at a leaf, the per-key item
/// hashes it owns) to produce its own hash. Leaves route by the hex digits of
/// `fnv1a_hash(key)`.
#[derive(Debug, Clone, Default)]
pub struct MerkleNode {
    /// This node's aggregate hash: the wrapping sum of children's hashes
    /// (internal node) or of owned item hashes (leaf node).
    hash: u32,
    /// Child nodes keyed by the next hex digit, present only below `depth`.
    children: HashMap<char, MerkleNode>,
    /// Leaf-only: key -> item hash, for keys that route to this bucket.
    items: HashMap<String, u32>,
}

impl MerkleNode {
    fn recompute_hash(&mut self) {
        self.hash = if self.children.is_empty() {
            combine_hashes(&self.items.values().copied().collect::<Vec<_>>())
        } else {
            combine_hashes(&self.children.values().map(|c| c.hash).collect::<Vec<_>>())
        };
    }
}

/// Computes the bucket path (sequence of hex digits) for a key's hash, to the
/// given depth.
fn bucket_path(item_hash: u32, depth: u32) -> Vec<char> {
    let hex = format!("{item_hash:08x}");
    hex.chars().take(depth as usize).collect()
}

/// Inserts or updates an item hash at the trie position addressed by `path`,
/// creating intermediate nodes as needed, then recomputes hashes bottom-up.
fn insert_at(node: &mut MerkleNode, path: &[char], key: &str, item_hash: u32) {
    match path.split_first() {
        None => {
            node.items.insert(key.to_string(), item_hash);
        }
        Some((digit, rest)) => {
            let child = node.children.entry(*digit).or_default();
            insert_at(child, rest, key, item_hash);
        }
    }
    node.recompute_hash();
}

/// Removes an item from the trie position addressed by `path`, pruning empty
/// intermediate nodes, then recomputes hashes bottom-up.
///
/// Returns `true` if the node (and all its children) are now empty and can be
/// pruned from its parent.
fn remove_at(node: &mut MerkleNode, path: &[char], key: &str) -> bool {
    match path.split_first() {
        None => {
            node.items.remove(key);
        }
        Some((digit, rest)) => {
            let mut prune_child = false;
            if let Some(child) = node.children.get_mut(digit) {
                prune_child = remove_at(child, rest, key);
            }
            if prune_child {
                node.children.remove(digit);
            }
        }
    }
    node.recompute_hash();
    node.children.is_empty() && node.items.is_empty()
}

/// Bucketed Merkle trie for an `LWWMap<V>`'s keyspace.
///
/// Each key's leaf hash is the FNV-1a hash of `"key:millis:counter:nodeId"`,
/// computed by the caller ([`crate::lww_map::LWWMap`]) and passed to
/// [`MerkleTree::update`]. Internal node hashes are the wrapping sum of their
/// children's hashes, so two trees converge to the same root hash iff every
/// key maps to the same item hash, regardless of insertion order.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    root: MerkleNode,
    depth: u32,
    /// Reverse index so `remove(key)` doesn't need to recompute the bucket
    /// path from a now-stale hash.
    key_hashes: HashMap<String, u32>,
}

impl MerkleTree {
    /// Creates an empty tree with the given bucket depth.
    #[must_use]
    pub fn new(depth: u32) -> Self {
        Self {
            root: MerkleNode::default(),
            depth,
            key_hashes: HashMap::new(),
        }
    }

    /// Creates an empty tree using [`DEFAULT_DEPTH`].
    #[must_use]
    pub fn default_depth() -> Self {
        Self::new(DEFAULT_DEPTH)
    }

    /// Inserts or updates a key's item hash, routing it through `depth` hex
    /// buckets of its own hash.
    pub fn update(&mut self, key: &str, item_hash: u32) {
        if let Some(old_hash) = self.key_hashes.get(key).copied() {
            if old_hash != item_hash {
                let old_path = bucket_path(old_hash, self.depth);
                remove_at(&mut self.root, &old_path, key);
            }
        }
        let path = bucket_path(item_hash, self.depth);
        insert_at(&mut self.root, &path, key, item_hash);
        self.key_hashes.insert(key.to_string(), item_hash);
    }

    /// Removes a key from the tree, pruning empty intermediate buckets.
    pub fn remove(&mut self, key: &str) {
        let Some(item_hash) = self.key_hashes.remove(key) else {
            return;
        };
        let path = bucket_path(item_hash, self.depth);
        remove_at(&mut self.root, &path, key);
    }

    /// Returns the root hash: `0` for an empty tree.
    #[must_use]
    pub fn get_root_hash(&self) -> u32 {
        self.root.hash
    }

    /// Returns the configured bucket depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the hash at a given bucket path, or `None` if no such bucket
    /// has been populated. Used by anti-entropy to walk down to the specific
    /// differing sub-bucket once root hashes disagree.
    #[must_use]
    pub fn bucket_hash(&self, path: &[char]) -> Option<u32> {
        let mut node = &self.root;
        for digit in path {
            node = node.children.get(digit)?;
        }
        Some(node.hash)
    }
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::default_depth()
    }
}

/// Bucketed Merkle trie for an `ORMap<V>`'s keyspace.
///
/// Unlike [`MerkleTree`], each key's item hash here summarizes the *whole*
/// observed-remove record set for that key (every active tag + timestamp),
/// since one OR-Map key may hold many concurrently-added records. The caller
/// ([`crate::or_map::ORMap`]) is responsible for folding its per-key record
/// set into a single `u32` (typically via [`combine_hashes`] over each
/// record's own `fnv1a_hash`) before calling [`ORMapMerkleTree::update`].
#[derive(Debug, Clone)]
pub struct ORMapMerkleTree {
    inner: MerkleTree,
}

impl ORMapMerkleTree {
    /// Creates an empty tree with the given bucket depth.
    #[must_use]
    pub fn new(depth: u32) -> Self {
        Self {
            inner: MerkleTree::new(depth),
        }
    }

    /// Creates an empty tree using [`DEFAULT_DEPTH`].
    #[must_use]
    pub fn default_depth() -> Self {
        Self::new(DEFAULT_DEPTH)
    }

    /// Inserts, updates, or (if the key now has no active records) clears a
    /// key's aggregate hash.
    pub fn update(&mut self, key: &str, aggregate_hash: u32) {
        self.inner.update(key, aggregate_hash);
    }

    /// Removes a key entirely from the tree.
    pub fn remove(&mut self, key: &str) {
        self.inner.remove(key);
    }

    /// Returns the root hash: `0` for an empty tree.
    #[must_use]
    pub fn get_root_hash(&self) -> u32 {
        self.inner.get_root_hash()
    }

    /// Returns the configured bucket depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.inner.depth()
    }

    /// Returns the hash at a given bucket path, or `None` if unpopulated.
    #[must_use]
    pub fn bucket_hash(&self, path: &[char]) -> Option<u32> {
        self.inner.bucket_hash(path)
    }
}

impl Default for ORMapMerkleTree {
    fn default() -> Self {
        Self::default_depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_root_hash_is_zero() {
        let tree = MerkleTree::default_depth();
        assert_eq!(tree.get_root_hash(), 0);
    }

    #[test]
    fn single_update_changes_root_hash() {
        let mut tree = MerkleTree::default_depth();
        tree.update("key1", 42);
        assert_ne!(tree.get_root_hash(), 0);
    }

    #[test]
    fn update_is_order_independent() {
        let mut tree1 = MerkleTree::default_depth();
        tree1.update("a", 1);
        tree1.update("b", 2);
        tree1.update("c", 3);

        let mut tree2 = MerkleTree::default_depth();
        tree2.update("c", 3);
        tree2.update("a", 1);
        tree2.update("b", 2);

        assert_eq!(tree1.get_root_hash(), tree2.get_root_hash());
    }

    #[test]
    fn updating_same_key_replaces_not_accumulates() {
        let mut tree = MerkleTree::default_depth();
        tree.update("key1", 100);
        let hash_after_first = tree.get_root_hash();

        tree.update("key1", 100);
        assert_eq!(tree.get_root_hash(), hash_after_first);
    }

    #[test]
    fn updating_key_with_new_hash_changes_root() {
        let mut tree = MerkleTree::default_depth();
        tree.update("key1", 100);
        let hash1 = tree.get_root_hash();

        tree.update("key1", 200);
        let hash2 = tree.get_root_hash();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn remove_restores_empty_root_hash() {
        let mut tree = MerkleTree::default_depth();
        tree.update("key1", 42);
        tree.remove("key1");
        assert_eq!(tree.get_root_hash(), 0);
    }

    #[test]
    fn remove_nonexistent_key_is_noop() {
        let mut tree = MerkleTree::default_depth();
        tree.update("key1", 42);
        let before = tree.get_root_hash();
        tree.remove("does-not-exist");
        assert_eq!(tree.get_root_hash(), before);
    }

    #[test]
    fn remove_one_of_many_keys_changes_hash_but_not_to_zero() {
        let mut tree = MerkleTree::default_depth();
        tree.update("a", 1);
        tree.update("b", 2);
        tree.remove("a");
        assert_ne!(tree.get_root_hash(), 0);
    }

    #[test]
    fn two_trees_converge_after_same_mutations() {
        let mut tree1 = MerkleTree::default_depth();
        let mut tree2 = MerkleTree::default_depth();

        for (k, h) in [("alpha", 10), ("beta", 20), ("gamma", 30)] {
            tree1.update(k, h);
        }
        for (k, h) in [("gamma", 30), ("alpha", 10), ("beta", 20)] {
            tree2.update(k, h);
        }

        assert_eq!(tree1.get_root_hash(), tree2.get_root_hash());
    }

    #[test]
    fn diverged_trees_have_different_root_hash() {
        let mut tree1 = MerkleTree::default_depth();
        let mut tree2 = MerkleTree::default_depth();

        tree1.update("k", 1);
        tree2.update("k", 2);

        assert_ne!(tree1.get_root_hash(), tree2.get_root_hash());
    }

    #[test]
    fn custom_depth_is_reported() {
        let tree = MerkleTree::new(5);
        assert_eq!(tree.depth(), 5);
    }

    #[test]
    fn bucket_hash_unpopulated_is_none() {
        let tree = MerkleTree::default_depth();
        assert_eq!(tree.bucket_hash(&['f', 'f', 'f']), None);
    }

    #[test]
    fn bucket_hash_populated_matches_fnv_bucket() {
        let mut tree = MerkleTree::default_depth();
        let item_hash = fnv1a_hash("probe:1:0:node");
        tree.update("probe", item_hash);
        let path = bucket_path(item_hash, DEFAULT_DEPTH);
        assert_eq!(tree.bucket_hash(&path), Some(item_hash));
    }

    // ---- ORMapMerkleTree ----

    #[test]
    fn or_map_merkle_tree_empty_root_hash_is_zero() {
        let tree = ORMapMerkleTree::default_depth();
        assert_eq!(tree.get_root_hash(), 0);
    }

    #[test]
    fn or_map_merkle_tree_update_and_remove_roundtrip() {
        let mut tree = ORMapMerkleTree::default_depth();
        tree.update("key1", combine_hashes(&[1, 2, 3]));
        assert_ne!(tree.get_root_hash(), 0);
        tree.remove("key1");
        assert_eq!(tree.get_root_hash(), 0);
    }

    #[test]
    fn or_map_merkle_tree_order_independent() {
        let mut tree1 = ORMapMerkleTree::default_depth();
        let mut tree2 = ORMapMerkleTree::default_depth();

        tree1.update("x", 5);
        tree1.update("y", 7);
        tree2.update("y", 7);
        tree2.update("x", 5);

        assert_eq!(tree1.get_root_hash(), tree2.get_root_hash());
    }
}
