//! The shift B-tree: point operations over effective key values.
//!
//! Every operation accepts and returns *effective* values. On entering a node
//! with lazy shift `s` the search value is translated by `-s` once, after
//! which the node's stored values compare directly; references handed back
//! out carry the accumulated shift so the caller can reconstruct the
//! effective value.

use minidex_common::{IndexConfig, MinidexError, Result};

use super::arena::{NodeArena, NodeId};
use super::constants::INITIAL_ARENA_NODES;
use super::entry::{EntryRef, KeyEntry, RemovedEntry, ShiftKey};
use super::node::Node;

/// Augmented B-tree with lazy subtree shifts.
///
/// Keys are signed integers in effective-value semantics; each key owns a
/// non-empty, insertion-ordered satellite list. `B` is the branching factor
/// (maximum keys per node), `T` the minimum degree (`2 <= T <= B`); every
/// non-root node keeps between `T - 1` and `B` keys.
pub struct ShiftBTree<K, S, const B: usize = 7, const T: usize = 3> {
    pub(crate) arena: NodeArena<K, S>,
    pub(crate) root: NodeId,
}

/// Location of an entry inside the arena, with the shift accumulated from the
/// root down to and including the entry's node.
#[derive(Clone, Copy)]
pub(crate) struct Hit<K> {
    pub node: NodeId,
    pub index: usize,
    pub shift: K,
}

impl<K: ShiftKey, S, const B: usize, const T: usize> Default for ShiftBTree<K, S, B, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ShiftKey, S, const B: usize, const T: usize> ShiftBTree<K, S, B, T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        const { assert!(T >= 2 && T <= B, "minimum degree must satisfy 2 <= T <= B") };
        Self {
            arena: NodeArena::with_capacity(INITIAL_ARENA_NODES),
            root: NodeId::NIL,
        }
    }

    /// Creates an empty tree with a validated configuration.
    pub fn with_config(config: &IndexConfig) -> Result<Self> {
        const { assert!(T >= 2 && T <= B, "minimum degree must satisfy 2 <= T <= B") };
        config.validate()?;
        Ok(Self {
            arena: NodeArena::with_capacity(config.initial_node_capacity),
            root: NodeId::NIL,
        })
    }

    /// Creates a tree holding a single entry.
    pub fn make_set(value: K, satellite: S) -> Self {
        let mut tree = Self::new();
        tree.insert(value, satellite);
        tree
    }

    /// True iff the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root == NodeId::NIL
    }

    /// Height of the tree: 0 when empty, 1 for a single leaf.
    pub fn height(&self) -> usize {
        if self.root == NodeId::NIL {
            0
        } else {
            self.node_height(self.root)
        }
    }

    /// The smallest effective key, if any.
    pub fn get_min(&self) -> Option<K> {
        if self.root == NodeId::NIL {
            return None;
        }
        Some(self.subtree_min(self.root))
    }

    /// The largest effective key, if any.
    pub fn get_max(&self) -> Option<K> {
        if self.root == NodeId::NIL {
            return None;
        }
        Some(self.subtree_max(self.root))
    }

    /// Adds `delta` to every effective key. O(1): folds into the root shift.
    pub fn shift(&mut self, delta: K) {
        if self.root != NodeId::NIL {
            let root = &mut self.arena[self.root];
            root.shift = root.shift + delta;
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Finds the entry with effective key `value`.
    pub fn search(&self, value: K) -> Option<EntryRef<'_, K, S>> {
        if self.root == NodeId::NIL {
            return None;
        }
        self.search_at(self.root, value).map(|hit| self.entry_ref(hit))
    }

    /// Largest entry with effective key `<= value`.
    pub fn predecessor(&self, value: K) -> Option<EntryRef<'_, K, S>> {
        let mut id = self.root;
        if id == NodeId::NIL {
            return None;
        }
        let mut value = value;
        let mut acc = K::ZERO;
        let mut best: Option<Hit<K>> = None;
        loop {
            let node = &self.arena[id];
            acc = acc + node.shift;
            value = value - node.shift;
            let ub = node.upper_bound(value);
            if ub > 0 {
                // nearest separator bounding `value` from below; deeper wins
                best = Some(Hit { node: id, index: ub - 1, shift: acc });
            }
            if node.is_leaf() {
                return best.map(|hit| self.entry_ref(hit));
            }
            id = node.children[ub];
        }
    }

    /// Smallest entry with effective key `> value`.
    pub fn successor(&self, value: K) -> Option<EntryRef<'_, K, S>> {
        let mut id = self.root;
        if id == NodeId::NIL {
            return None;
        }
        let mut value = value;
        let mut acc = K::ZERO;
        let mut best: Option<Hit<K>> = None;
        loop {
            let node = &self.arena[id];
            acc = acc + node.shift;
            value = value - node.shift;
            let ub = node.upper_bound(value);
            if ub < node.len() {
                best = Some(Hit { node: id, index: ub, shift: acc });
            }
            if node.is_leaf() {
                return best.map(|hit| self.entry_ref(hit));
            }
            id = node.children[ub];
        }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Inserts `(value, satellite)`. If the key already exists, the satellite
    /// is appended to its list. Returns a reference to the entry.
    pub fn insert(&mut self, value: K, satellite: S) -> EntryRef<'_, K, S> {
        if self.root == NodeId::NIL {
            let mut root = Node::leaf();
            root.entries.push(KeyEntry::new(value, satellite));
            self.root = self.arena.alloc(root);
            return self.entry_ref(Hit { node: self.root, index: 0, shift: K::ZERO });
        }
        if self.arena[self.root].is_full(B) {
            // the only operation that increases tree height
            self.grow_root(self.root);
        }
        let hit = self.insert_at(self.root, value, satellite, K::ZERO);
        self.entry_ref(hit)
    }

    fn insert_at(&mut self, id: NodeId, value: K, satellite: S, acc: K) -> Hit<K> {
        let node = &self.arena[id];
        let acc = acc + node.shift;
        let value = value - node.shift;
        let ub = node.upper_bound(value);
        if node.matches_at(ub, value) {
            self.arena[id].entries[ub - 1].satellites.push(satellite);
            return Hit { node: id, index: ub - 1, shift: acc };
        }
        if node.is_leaf() {
            self.arena[id]
                .entries
                .insert(ub, KeyEntry::new(value, satellite));
            return Hit { node: id, index: ub, shift: acc };
        }

        let mut ci = ub;
        let child = self.arena[id].children[ci];
        if self.arena[child].is_full(B) {
            self.split_child(id, ci);
            // the promoted median landed at index `ci`; decide again
            let node = &self.arena[id];
            match node.entries[ci].value.cmp(&value) {
                std::cmp::Ordering::Equal => {
                    self.arena[id].entries[ci].satellites.push(satellite);
                    return Hit { node: id, index: ci, shift: acc };
                }
                std::cmp::Ordering::Less => ci += 1,
                std::cmp::Ordering::Greater => {}
            }
        }
        let child = self.arena[id].children[ci];
        self.insert_at(child, value, satellite, acc)
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Removes the entry with effective key `value`, returning it with its
    /// satellite list, or `None` if the key is absent.
    pub fn remove(&mut self, value: K) -> Option<RemovedEntry<K, S>> {
        if self.root == NodeId::NIL {
            return None;
        }
        let removed = self.remove_at(self.root, value);
        if self.arena[self.root].len() == 0 {
            // internal roots are absorbed inside merge_children; an empty
            // root here is a leaf whose last key was just extracted
            debug_assert!(self.arena[self.root].is_leaf());
            self.arena.free(self.root);
            self.root = NodeId::NIL;
        }
        removed
    }

    /// Removes `value` from the subtree rooted at `id`.
    ///
    /// `value` is expressed in the frame *above* `id` (ancestor shifts already
    /// folded out); the returned value is rebased into the same frame.
    pub(crate) fn remove_at(&mut self, id: NodeId, value: K) -> Option<RemovedEntry<K, S>> {
        let sh = self.arena[id].shift;
        let v = value - sh;
        let node = &self.arena[id];
        let ub = node.upper_bound(v);
        let found = node.matches_at(ub, v);

        if node.is_leaf() {
            if !found {
                return None;
            }
            let entry = self.arena[id].shift_left(ub - 1);
            return Some(RemovedEntry {
                value: entry.value + sh,
                satellites: entry.satellites,
            });
        }

        if found {
            let l = ub - 1;
            let y = self.arena[id].children[l];
            let z = self.arena[id].children[l + 1];
            if self.arena[y].len() >= T {
                // swap the predecessor up and extract it from the left child
                let pred = self.subtree_max(y);
                let moved = self.remove_at(y, pred)?;
                let old = std::mem::replace(
                    &mut self.arena[id].entries[l],
                    KeyEntry { value: moved.value, satellites: moved.satellites },
                );
                Some(RemovedEntry { value: old.value + sh, satellites: old.satellites })
            } else if self.arena[z].len() >= T {
                let succ = self.subtree_min(z);
                let moved = self.remove_at(z, succ)?;
                let old = std::mem::replace(
                    &mut self.arena[id].entries[l],
                    KeyEntry { value: moved.value, satellites: moved.satellites },
                );
                Some(RemovedEntry { value: old.value + sh, satellites: old.satellites })
            } else {
                // both neighbours are minimal: sink the separator and retry
                self.merge_children(id, l, None);
                self.remove_at(id, value)
            }
        } else {
            let l = ub;
            let c = self.arena[id].children[l];
            if self.arena[c].len() < T {
                let has_left = l > 0 && self.arena[self.arena[id].children[l - 1]].len() >= T;
                let has_right =
                    l < self.arena[id].len() && self.arena[self.arena[id].children[l + 1]].len() >= T;
                if has_left {
                    self.borrow_from_left(id, l);
                } else if has_right {
                    self.borrow_from_right(id, l);
                } else {
                    let at = if l > 0 { l - 1 } else { l };
                    self.merge_children(id, at, None);
                    return self.remove_at(id, value);
                }
            }
            let c = self.arena[id].children[l];
            let moved = self.remove_at(c, v)?;
            Some(RemovedEntry { value: moved.value + sh, satellites: moved.satellites })
        }
    }

    /// Rotates one key from `children[l - 1]` through the parent into
    /// `children[l]`, re-basing the key and any moved child subtree.
    fn borrow_from_left(&mut self, id: NodeId, l: usize) {
        let lhs = self.arena[id].children[l - 1];
        let c = self.arena[id].children[l];
        let lhs_shift = self.arena[lhs].shift;
        let c_shift = self.arena[c].shift;

        let mut up = self.arena[lhs].entries.pop().expect("donor has >= T keys");
        up.rebase(lhs_shift, K::ZERO);
        let mut down = std::mem::replace(&mut self.arena[id].entries[l - 1], up);
        down.rebase(K::ZERO, c_shift);
        self.arena[c].entries.insert(0, down);

        if !self.arena[c].is_leaf() {
            let moved = self.arena[lhs].children.pop().expect("internal donor has children");
            self.arena[moved].rebase_shift(lhs_shift, c_shift);
            self.arena[c].children.insert(0, moved);
        }
    }

    /// Mirror image of [`Self::borrow_from_left`].
    fn borrow_from_right(&mut self, id: NodeId, l: usize) {
        let c = self.arena[id].children[l];
        let rhs = self.arena[id].children[l + 1];
        let rhs_shift = self.arena[rhs].shift;
        let c_shift = self.arena[c].shift;

        let mut up = self.arena[rhs].entries.remove(0);
        up.rebase(rhs_shift, K::ZERO);
        let mut down = std::mem::replace(&mut self.arena[id].entries[l], up);
        down.rebase(K::ZERO, c_shift);
        self.arena[c].entries.push(down);

        if !self.arena[c].is_leaf() {
            let moved = self.arena[rhs].children.remove(0);
            self.arena[moved].rebase_shift(rhs_shift, c_shift);
            self.arena[c].children.push(moved);
        }
    }

    // =========================================================================
    // Range shift
    // =========================================================================

    /// Adds `delta` to every entry with effective key `>= value`, including
    /// the entry at `value` itself.
    ///
    /// Touches O(B) keys per level plus O(1) lazy child shifts per level.
    /// The key `value` must be present; this is a caller contract (use
    /// [`Self::successor`] first when unsure). In release builds an absent key
    /// still shifts the searched path and returns `None`.
    pub fn shift_greater(&mut self, value: K, delta: K) -> Option<EntryRef<'_, K, S>> {
        if self.root == NodeId::NIL {
            return None;
        }
        tracing::trace!(value = ?value, delta = ?delta, "shift_greater");
        let hit = self.shift_greater_at(self.root, value, delta, K::ZERO);
        debug_assert!(hit.is_some(), "shift_greater requires the pivot key to be present");
        hit.map(|hit| self.entry_ref(hit))
    }

    fn shift_greater_at(&mut self, id: NodeId, value: K, delta: K, acc: K) -> Option<Hit<K>> {
        let node = &self.arena[id];
        let acc = acc + node.shift;
        let value = value - node.shift;
        let ub = node.upper_bound(value);
        let found = node.matches_at(ub, value);
        let l = if found { ub - 1 } else { ub };

        let node = &mut self.arena[id];
        for entry in node.entries[l..].iter_mut() {
            entry.value = entry.value + delta;
        }
        let n = self.arena[id].len();
        if !self.arena[id].is_leaf() {
            // subtrees strictly right of position l are shifted lazily
            for i in l + 1..=n {
                let child = self.arena[id].children[i];
                let node = &mut self.arena[child];
                node.shift = node.shift + delta;
            }
        }

        if found {
            tracing::trace!(node = ?id, index = l, "shift_greater matched");
            return Some(Hit { node: id, index: l, shift: acc });
        }
        if self.arena[id].is_leaf() {
            return None;
        }
        let child = self.arena[id].children[l];
        self.shift_greater_at(child, value, delta, acc)
    }

    /// Removes every entry with effective key in `[low, high]`, returning how
    /// many were removed. Uses `successor` to step across gaps instead of
    /// probing every integer in the range.
    pub fn remove_range(&mut self, low: K, high: K) -> usize {
        let mut removed = 0;
        let mut cursor = low - K::ONE;
        while let Some(next) = self.successor(cursor).map(|e| e.value()) {
            if next > high {
                break;
            }
            self.remove(next);
            removed += 1;
            cursor = next;
        }
        removed
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    pub(crate) fn entry_ref(&self, hit: Hit<K>) -> EntryRef<'_, K, S> {
        EntryRef::new(&self.arena[hit.node].entries[hit.index], hit.shift)
    }

    pub(crate) fn search_at(&self, id: NodeId, value: K) -> Option<Hit<K>> {
        let mut id = id;
        let mut value = value;
        let mut acc = K::ZERO;
        loop {
            let node = &self.arena[id];
            acc = acc + node.shift;
            value = value - node.shift;
            let ub = node.upper_bound(value);
            if node.matches_at(ub, value) {
                return Some(Hit { node: id, index: ub - 1, shift: acc });
            }
            if node.is_leaf() {
                return None;
            }
            id = node.children[ub];
        }
    }

    /// Effective minimum of the subtree, in the frame above `id`.
    /// Folds shifts down the leftmost spine.
    pub(crate) fn subtree_min(&self, id: NodeId) -> K {
        let mut id = id;
        let mut acc = K::ZERO;
        loop {
            let node = &self.arena[id];
            acc = acc + node.shift;
            if node.is_leaf() {
                return node.entries.first().expect("non-empty node").value + acc;
            }
            id = node.children[0];
        }
    }

    /// Effective maximum of the subtree, in the frame above `id`.
    pub(crate) fn subtree_max(&self, id: NodeId) -> K {
        let mut id = id;
        let mut acc = K::ZERO;
        loop {
            let node = &self.arena[id];
            acc = acc + node.shift;
            if node.is_leaf() {
                return node.entries.last().expect("non-empty node").value + acc;
            }
            id = node.children[node.len()];
        }
    }

    /// Height of the subtree rooted at `id` (1 for a leaf). O(h).
    pub(crate) fn node_height(&self, id: NodeId) -> usize {
        let mut id = id;
        let mut h = 1;
        while !self.arena[id].is_leaf() {
            id = self.arena[id].children[0];
            h += 1;
        }
        h
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Checks every structural invariant, returning a diagnostic on the first
    /// violation: occupancy bounds, child arity, equal leaf depth, per-node
    /// sort order, non-empty satellite lists, and globally increasing
    /// effective keys.
    pub fn verify_integrity(&self) -> Result<()> {
        if self.root == NodeId::NIL {
            if self.arena.live() != 0 {
                return Err(MinidexError::TreeCorrupted(format!(
                    "empty tree holds {} orphaned node slots",
                    self.arena.live()
                )));
            }
            return Ok(());
        }
        let mut leaf_depth = None;
        let mut reachable = 0;
        self.verify_node(self.root, true, 1, &mut leaf_depth, &mut reachable)?;
        if reachable != self.arena.live() {
            return Err(MinidexError::TreeCorrupted(format!(
                "{} live node slots but {reachable} reachable from the root",
                self.arena.live()
            )));
        }

        let mut prev: Option<K> = None;
        for (value, satellites) in self.iter() {
            if satellites.is_empty() {
                return Err(MinidexError::TreeCorrupted(format!(
                    "key {value:?} has an empty satellite list"
                )));
            }
            if let Some(p) = prev {
                if p >= value {
                    return Err(MinidexError::TreeCorrupted(format!(
                        "effective keys not strictly increasing: {p:?} before {value:?}"
                    )));
                }
            }
            prev = Some(value);
        }
        Ok(())
    }

    fn verify_node(
        &self,
        id: NodeId,
        is_root: bool,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        reachable: &mut usize,
    ) -> Result<()> {
        *reachable += 1;
        let node = &self.arena[id];
        let n = node.len();
        if n > B {
            return Err(MinidexError::TreeCorrupted(format!(
                "node {id:?} holds {n} keys, branching factor is {B}"
            )));
        }
        if is_root {
            if n == 0 {
                return Err(MinidexError::TreeCorrupted("root node is empty".to_string()));
            }
        } else if n < T - 1 {
            return Err(MinidexError::TreeCorrupted(format!(
                "node {id:?} holds {n} keys, minimum is {}",
                T - 1
            )));
        }
        for pair in node.entries.windows(2) {
            if pair[0].value >= pair[1].value {
                return Err(MinidexError::TreeCorrupted(format!(
                    "node {id:?} stored keys out of order"
                )));
            }
        }
        if node.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(MinidexError::TreeCorrupted(format!(
                        "leaf depth mismatch: {depth} vs {d}"
                    )));
                }
                Some(_) => {}
            }
        } else {
            if node.children.len() != n + 1 {
                return Err(MinidexError::TreeCorrupted(format!(
                    "node {id:?} has {n} keys but {} children",
                    node.children.len()
                )));
            }
            for &child in &node.children {
                self.verify_node(child, false, depth + 1, leaf_depth, reachable)?;
            }
        }
        Ok(())
    }

    /// Boolean wrapper around [`Self::verify_integrity`]; diagnostic only.
    pub fn check_integrity(&self) -> bool {
        match self.verify_integrity() {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "integrity check failed");
                false
            }
        }
    }
}

impl<K: ShiftKey, S, const B: usize, const T: usize> Extend<(K, S)> for ShiftBTree<K, S, B, T> {
    fn extend<I: IntoIterator<Item = (K, S)>>(&mut self, iter: I) {
        for (value, satellite) in iter {
            self.insert(value, satellite);
        }
    }
}

impl<K: ShiftKey, S, const B: usize, const T: usize> FromIterator<(K, S)>
    for ShiftBTree<K, S, B, T>
{
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Tree = ShiftBTree<i64, &'static str>;

    #[test]
    fn test_empty_tree() {
        let tree = Tree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert!(tree.search(1).is_none());
        assert!(tree.get_min().is_none());
        assert!(tree.get_max().is_none());
    }

    #[test]
    fn test_insert_and_search() {
        let mut tree = Tree::new();
        tree.insert(5, "a");
        tree.insert(2, "b");
        tree.insert(8, "c");
        assert_eq!(tree.search(5).map(|e| e.value()), Some(5));
        assert_eq!(tree.search(2).map(|e| e.satellites()), Some(&["b"][..]));
        assert!(tree.search(3).is_none());
        assert_eq!(tree.get_min(), Some(2));
        assert_eq!(tree.get_max(), Some(8));
    }

    #[test]
    fn test_duplicate_key_appends_satellite() {
        let mut tree = Tree::new();
        tree.insert(5, "a");
        let entry = tree.insert(5, "d");
        assert_eq!(entry.satellites(), &["a", "d"]);
    }

    #[test]
    fn test_insert_grows_height() {
        let mut tree: ShiftBTree<i64, i64, 3, 2> = ShiftBTree::new();
        for i in 0..20 {
            tree.insert(i, i);
        }
        assert!(tree.height() >= 2);
        assert!(tree.check_integrity());
    }

    #[test]
    fn test_remove_leaf_key() {
        let mut tree = Tree::new();
        tree.insert(1, "a");
        tree.insert(2, "b");
        let removed = tree.remove(1).unwrap();
        assert_eq!(removed.value, 1);
        assert_eq!(removed.satellites, vec!["a"]);
        assert!(tree.search(1).is_none());
        assert!(tree.remove(1).is_none());
    }

    #[test]
    fn test_remove_to_empty() {
        let mut tree = Tree::new();
        tree.insert(7, "x");
        assert!(tree.remove(7).is_some());
        assert!(tree.is_empty());
        assert_eq!(tree.arena.live(), 0);
    }

    #[test]
    fn test_shift_moves_all_keys() {
        let mut tree = Tree::new();
        tree.insert(1, "a");
        tree.insert(5, "b");
        tree.shift(10);
        assert_eq!(tree.get_min(), Some(11));
        assert_eq!(tree.get_max(), Some(15));
        assert!(tree.search(11).is_some());
        assert!(tree.search(1).is_none());
    }

    #[test]
    fn test_shift_is_cumulative() {
        let mut tree = Tree::new();
        tree.insert(3, "a");
        tree.shift(4);
        tree.shift(-2);
        assert_eq!(tree.get_min(), Some(5));
    }

    #[test]
    fn test_predecessor_successor() {
        let mut tree = Tree::new();
        for v in [2, 5, 8] {
            tree.insert(v, "s");
        }
        assert_eq!(tree.predecessor(5).map(|e| e.value()), Some(5));
        assert_eq!(tree.predecessor(4).map(|e| e.value()), Some(2));
        assert!(tree.predecessor(1).is_none());
        assert_eq!(tree.successor(5).map(|e| e.value()), Some(8));
        assert_eq!(tree.successor(1).map(|e| e.value()), Some(2));
        assert!(tree.successor(8).is_none());
    }

    #[test]
    fn test_remove_range_skips_gaps() {
        let mut tree = Tree::new();
        for v in [1, 4, 9, 12, 20] {
            tree.insert(v, "s");
        }
        let removed = tree.remove_range(3, 12);
        assert_eq!(removed, 3);
        let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 20]);
    }

    #[test]
    fn test_with_config_validation() {
        let bad = IndexConfig { initial_node_capacity: 0 };
        assert!(Tree::with_config(&bad).is_err());
        let good = IndexConfig::default();
        assert!(Tree::with_config(&good).is_ok());
    }
}
