//! Structural bulk operations: node splitting and fusing, height-threaded
//! joins, split around a pivot, and the order-preserving merge.
//!
//! All surgery happens on handles inside one arena. Crossing a tree boundary
//! (`split` returning a new tree, `join`/`merge` absorbing one) transplants
//! the reachable node slots exactly once; the merge loop adopts the other
//! tree's nodes up front and then runs entirely in-arena.
//!
//! Heights are threaded as `&mut usize` out-parameters through the join and
//! split recursion; recomputing them inside the recursion would cost O(h²).

use super::arena::{NodeArena, NodeId};
use super::entry::{KeyEntry, ShiftKey};
use super::node::Node;
use super::tree::ShiftBTree;

impl<K: ShiftKey, S, const B: usize, const T: usize> ShiftBTree<K, S, B, T> {
    // =========================================================================
    // Node splitting and fusing
    // =========================================================================

    /// Splits the full child at `i` into two siblings around its median.
    ///
    /// The right sibling inherits the left one's lazy shift, so only the
    /// promoted median needs re-basing into the parent's frame.
    pub(crate) fn split_child(&mut self, parent: NodeId, i: usize) {
        let lhs = self.arena[parent].children[i];
        let (median, rhs_node) = {
            let lnode = &mut self.arena[lhs];
            let median_pos = lnode.len() / 2;
            let entries = lnode.entries.split_off(median_pos + 1);
            let children = if lnode.is_leaf() {
                Vec::new()
            } else {
                lnode.children.split_off(median_pos + 1)
            };
            let mut median = lnode.entries.pop().expect("splitting a non-empty node");
            median.rebase(lnode.shift, K::ZERO);
            (median, Node { entries, children, shift: lnode.shift })
        };
        let rhs = self.arena.alloc(rhs_node);
        let pnode = &mut self.arena[parent];
        pnode.entries.insert(i, median);
        pnode.children.insert(i + 1, rhs);
    }

    /// Fuses `children[i]` and `children[i + 1]` into one node around the
    /// separator at `i`. Precondition: the result fits (`<= B` keys).
    ///
    /// If the parent loses its last key it absorbs the merged child,
    /// shrinking the tree height; `height` is decremented when threaded.
    pub(crate) fn merge_children(&mut self, parent: NodeId, i: usize, height: Option<&mut usize>) {
        let lhs = self.arena[parent].children[i];
        let rhs = self.arena[parent].children[i + 1];
        debug_assert!(self.arena[lhs].len() + self.arena[rhs].len() + 1 <= B);

        let mut sep = self.arena[parent].entries.remove(i);
        self.arena[parent].children.remove(i + 1);
        let rnode = self.arena.take(rhs);
        let lhs_shift = self.arena[lhs].shift;

        sep.rebase(K::ZERO, lhs_shift);
        self.arena[lhs].entries.push(sep);
        {
            let lnode = &mut self.arena[lhs];
            for mut entry in rnode.entries {
                entry.rebase(rnode.shift, lhs_shift);
                lnode.entries.push(entry);
            }
        }
        for child in rnode.children {
            self.arena[child].rebase_shift(rnode.shift, lhs_shift);
            self.arena[lhs].children.push(child);
        }

        if self.arena[parent].len() == 0 {
            // last separator gone: the parent absorbs the merged child
            let child = self.arena.take(lhs);
            let pnode = &mut self.arena[parent];
            pnode.entries = child.entries;
            pnode.children = child.children;
            pnode.shift = pnode.shift + child.shift;
            if let Some(h) = height {
                *h -= 1;
            }
        }
    }

    /// Merges or redistributes `children[i]` and `children[i + 1]` so both
    /// end up legally occupied. When the union fits in one node it merges;
    /// otherwise the global median across left keys, separator, and right
    /// keys moves up and the surplus side donates to the other.
    pub(crate) fn balance_children(&mut self, parent: NodeId, i: usize, height: Option<&mut usize>) {
        let lhs = self.arena[parent].children[i];
        let rhs = self.arena[parent].children[i + 1];
        let ln = self.arena[lhs].len();
        let rn = self.arena[rhs].len();
        if ln + rn + 1 <= B {
            return self.merge_children(parent, i, height);
        }

        let median_pos = (ln + rn + 1) >> 1;
        if median_pos == ln || median_pos == rn {
            return;
        }
        let lhs_shift = self.arena[lhs].shift;
        let rhs_shift = self.arena[rhs].shift;

        if median_pos < ln {
            // the left node donates its tail to the right node
            let offset = ln - median_pos;
            let mut tail = self.arena[lhs].entries.split_off(median_pos);
            let mut promoted = tail.remove(0);
            promoted.rebase(lhs_shift, K::ZERO);
            let mut sep = std::mem::replace(&mut self.arena[parent].entries[i], promoted);
            sep.rebase(K::ZERO, rhs_shift);
            for entry in tail.iter_mut() {
                entry.rebase(lhs_shift, rhs_shift);
            }
            tail.push(sep);
            debug_assert_eq!(tail.len(), offset);
            let moved_children = if self.arena[lhs].is_leaf() {
                Vec::new()
            } else {
                self.arena[lhs].children.split_off(median_pos + 1)
            };
            for &child in &moved_children {
                self.arena[child].rebase_shift(lhs_shift, rhs_shift);
            }
            let rnode = &mut self.arena[rhs];
            rnode.entries.splice(0..0, tail);
            rnode.children.splice(0..0, moved_children);
        } else {
            // the right node donates its head to the left node
            let offset = median_pos - ln - 1;
            let head: Vec<_> = self.arena[rhs].entries.drain(..offset).collect();
            let mut promoted = self.arena[rhs].entries.remove(0);
            promoted.rebase(rhs_shift, K::ZERO);
            let mut sep = std::mem::replace(&mut self.arena[parent].entries[i], promoted);
            sep.rebase(K::ZERO, lhs_shift);
            self.arena[lhs].entries.push(sep);
            {
                let lnode = &mut self.arena[lhs];
                for mut entry in head {
                    entry.rebase(rhs_shift, lhs_shift);
                    lnode.entries.push(entry);
                }
            }
            if !self.arena[lhs].is_leaf() {
                let moved: Vec<_> = self.arena[rhs].children.drain(..=offset).collect();
                for child in moved {
                    self.arena[child].rebase_shift(rhs_shift, lhs_shift);
                    self.arena[lhs].children.push(child);
                }
            }
        }
    }

    // =========================================================================
    // Root growth
    // =========================================================================

    /// Moves the node's content into a fresh child below it, leaving the
    /// handle itself as an empty internal node over that child. The demoted
    /// node keeps the lazy shift; the emptied root starts at zero.
    fn demote_root(&mut self, id: NodeId) -> NodeId {
        let demoted = self.arena.alloc(Node::leaf());
        self.arena.swap(id, demoted);
        self.arena[id].children.push(demoted);
        demoted
    }

    /// Grows a new root above a full node and splits the old root under it.
    pub(crate) fn grow_root(&mut self, id: NodeId) {
        self.demote_root(id);
        self.split_child(id, 0);
    }

    // =========================================================================
    // Height-threaded joins
    // =========================================================================

    /// Attaches `t2` (all keys greater than `pivot`) on the right spine of
    /// `t1`, with `pivot` separating them. Requires `*h1 >= h2`; `h1` tracks
    /// the resulting height.
    pub(crate) fn join_right(
        &mut self,
        t1: NodeId,
        t2: NodeId,
        mut pivot: KeyEntry<K, S>,
        h1: &mut usize,
        h2: usize,
    ) {
        debug_assert!(*h1 >= h2);
        if self.arena[t1].is_full(B) {
            self.grow_root(t1);
            *h1 += 1;
        }

        if *h1 == h2 {
            // equal heights: lift both trees under a fresh root
            let demoted = self.demote_root(t1);
            debug_assert!(self.arena[demoted].len() > 0);
            pivot.rebase(K::ZERO, self.arena[t1].shift);
            self.arena[t1].entries.push(pivot);
            self.arena[t1].children.push(t2);
            *h1 += 1;
            self.balance_children(t1, 0, Some(h1));
            return;
        }

        // walk the right spine down to the node at height h2 + 1
        let mut cur = t1;
        let mut cur_height = *h1;
        while cur_height > h2 + 1 {
            let last = self.arena[cur].len();
            let child = self.arena[cur].children[last];
            if self.arena[child].is_full(B) {
                self.split_child(cur, last);
            }
            let s = self.arena[cur].shift;
            self.arena[t2].rebase_shift(K::ZERO, s);
            pivot.rebase(K::ZERO, s);
            let last = self.arena[cur].len();
            cur = self.arena[cur].children[last];
            cur_height -= 1;
        }

        let s = self.arena[cur].shift;
        pivot.rebase(K::ZERO, s);
        self.arena[cur].entries.push(pivot);
        self.arena[t2].rebase_shift(K::ZERO, s);
        self.arena[cur].children.push(t2);
        let at = self.arena[cur].len() - 1;
        self.balance_children(cur, at, Some(h1));
    }

    /// Attaches `t2` (all keys smaller than `pivot`) on the left spine of
    /// `t1`. Requires `h2 < *h1` strictly.
    pub(crate) fn join_left(
        &mut self,
        t1: NodeId,
        t2: NodeId,
        mut pivot: KeyEntry<K, S>,
        h1: &mut usize,
        h2: usize,
    ) {
        debug_assert!(h2 < *h1);
        if self.arena[t1].is_full(B) {
            self.grow_root(t1);
            *h1 += 1;
        }

        let mut cur = t1;
        let mut cur_height = *h1;
        while cur_height > h2 + 1 {
            let child = self.arena[cur].children[0];
            if self.arena[child].is_full(B) {
                self.split_child(cur, 0);
            }
            let s = self.arena[cur].shift;
            self.arena[t2].rebase_shift(K::ZERO, s);
            pivot.rebase(K::ZERO, s);
            cur = self.arena[cur].children[0];
            cur_height -= 1;
        }

        let s = self.arena[cur].shift;
        pivot.rebase(K::ZERO, s);
        self.arena[cur].entries.insert(0, pivot);
        self.arena[t2].rebase_shift(K::ZERO, s);
        self.arena[cur].children.insert(0, t2);
        self.balance_children(cur, 0, Some(h1));
    }

    /// Joins two in-arena trees where every key of `t1` is strictly below
    /// every key of `t2`; returns the resulting root handle.
    ///
    /// The left tree's maximum is extracted as the pivot. Should that empty
    /// the left tree, the result is the right tree with the pivot pushed in
    /// as its new minimum.
    pub(crate) fn join_nodes(&mut self, t1: NodeId, t2: NodeId) -> NodeId {
        debug_assert!(self.subtree_max(t1) < self.subtree_min(t2));
        let max = self.subtree_max(t1);
        let removed = self.remove_at(t1, max).expect("max key is present");
        let pivot = KeyEntry { value: removed.value, satellites: removed.satellites };

        if self.arena[t1].len() == 0 {
            debug_assert!(self.arena[t1].is_leaf());
            self.arena.free(t1);
            self.push_min_entry(t2, pivot);
            return t2;
        }

        let mut h1 = self.node_height(t1);
        let mut h2 = self.node_height(t2);
        if h1 >= h2 {
            self.join_right(t1, t2, pivot, &mut h1, h2);
            t1
        } else {
            self.join_left(t2, t1, pivot, &mut h2, h1);
            t2
        }
    }

    /// Inserts an already-built entry as the new minimum of the subtree,
    /// splitting full nodes on the way down the left spine.
    fn push_min_entry(&mut self, root: NodeId, mut entry: KeyEntry<K, S>) {
        if self.arena[root].is_full(B) {
            self.grow_root(root);
        }
        let mut cur = root;
        loop {
            entry.rebase(K::ZERO, self.arena[cur].shift);
            if self.arena[cur].is_leaf() {
                self.arena[cur].entries.insert(0, entry);
                return;
            }
            let child = self.arena[cur].children[0];
            if self.arena[child].is_full(B) {
                self.split_child(cur, 0);
            }
            cur = self.arena[cur].children[0];
        }
    }

    // =========================================================================
    // Split around a value
    // =========================================================================

    /// Splits the subtree at `id` around `value` (in the frame above `id`):
    /// keys strictly greater than `value` move into the returned subtree, the
    /// rest stay at `id`. Either side may come back empty (a keyless leaf).
    ///
    /// `h_this` carries the height of `id` in and the left result's height
    /// out; `h_rhs` receives the right result's height.
    pub(crate) fn split_at(
        &mut self,
        id: NodeId,
        value: K,
        h_this: &mut usize,
        h_rhs: &mut usize,
    ) -> NodeId {
        let this_shift = self.arena[id].shift;
        let v = value - this_shift;
        *h_rhs = *h_this;

        if self.arena[id].is_leaf() {
            let l = self.arena[id].upper_bound(v);
            let tail = self.arena[id].entries.split_off(l);
            return self
                .arena
                .alloc(Node { entries: tail, children: Vec::new(), shift: this_shift });
        }

        let l = self.arena[id].upper_bound(v);
        let lhs_child = self.arena[id].children[l];

        // recursively split the straddling child, threading its height
        let mut h_sub = *h_this - 1;
        let mut h_rhs_sub = *h_this - 1;
        let rhs_child = self.split_at(lhs_child, v, &mut h_sub, &mut h_rhs_sub);
        self.arena[rhs_child].rebase_shift(this_shift, K::ZERO);
        self.arena[lhs_child].rebase_shift(this_shift, K::ZERO);

        let n = self.arena[id].len();
        let rhs;
        if l == n {
            // nothing of this node moves right
            rhs = rhs_child;
            *h_rhs = h_rhs_sub;
        } else if h_rhs_sub == *h_rhs - 1 {
            // the right half of the child kept full height: reattach it as
            // the leftmost child of the carved-off right node
            let entries = self.arena[id].entries.split_off(l);
            let mut children = self.arena[id].children.split_off(l + 1);
            self.arena[rhs_child].rebase_shift(K::ZERO, this_shift);
            children.insert(0, rhs_child);
            rhs = self.arena.alloc(Node { entries, children, shift: this_shift });
            self.balance_children(rhs, 0, Some(h_rhs));
        } else if l == n - 1 {
            // right side is a single child plus a shorter split half
            let mut sep = self.arena[id].entries.pop().expect("separator at l");
            sep.rebase(this_shift, K::ZERO);
            let r = self.arena[id].children.pop().expect("rightmost child");
            self.arena[r].rebase_shift(this_shift, K::ZERO);
            *h_rhs -= 1;
            if *h_rhs == h_rhs_sub {
                let mut h_join = h_rhs_sub;
                self.join_right(rhs_child, r, sep, &mut h_join, *h_rhs);
                *h_rhs = h_join;
                rhs = rhs_child;
            } else {
                debug_assert!(*h_rhs > h_rhs_sub);
                self.join_left(r, rhs_child, sep, h_rhs, h_rhs_sub);
                rhs = r;
            }
        } else {
            // general case: carve off keys[l+1..] with their children and
            // join the shorter split half onto its left spine
            let mut entries = self.arena[id].entries.split_off(l);
            let mut sep = entries.remove(0);
            sep.rebase(this_shift, K::ZERO);
            let children = self.arena[id].children.split_off(l + 1);
            rhs = self.arena.alloc(Node { entries, children, shift: this_shift });
            self.join_left(rhs, rhs_child, sep, h_rhs, h_rhs_sub);
        }

        // reassemble the left side around the split child's left half
        if l == 0 {
            // this node keeps no separator: collapse into the left half
            let child = self.arena.take(lhs_child);
            let node = &mut self.arena[id];
            node.entries = child.entries;
            node.children = child.children;
            node.shift = child.shift;
            *h_this = h_sub;
        } else {
            let mut sep = self.arena[id].entries.pop().expect("separator left of the split");
            sep.rebase(this_shift, K::ZERO);
            let detached = self.arena[id].children.pop().expect("child left of the split");
            debug_assert_eq!(detached, lhs_child);
            if l == 1 {
                // a single child remains: absorb it before joining
                let inner = self.arena[id].children[0];
                let child = self.arena.take(inner);
                let node = &mut self.arena[id];
                node.entries = child.entries;
                node.children = child.children;
                node.shift = node.shift + child.shift;
                *h_this -= 1;
            }
            self.join_right(id, lhs_child, sep, h_this, h_sub);
        }

        rhs
    }

    /// Splits the in-arena tree at `root`, releasing emptied roots.
    /// Returns the surviving left and right roots.
    pub(crate) fn split_root(
        &mut self,
        root: NodeId,
        value: K,
    ) -> (Option<NodeId>, Option<NodeId>) {
        let mut h_this = self.node_height(root);
        let mut h_rhs = 0;
        let rhs = self.split_at(root, value, &mut h_this, &mut h_rhs);
        let left = if self.arena[root].len() == 0 {
            debug_assert!(self.arena[root].is_leaf());
            self.arena.free(root);
            None
        } else {
            Some(root)
        };
        let right = if self.arena[rhs].len() == 0 {
            debug_assert!(self.arena[rhs].is_leaf());
            self.arena.free(rhs);
            None
        } else {
            Some(rhs)
        };
        (left, right)
    }

    fn join_roots(&mut self, a: Option<NodeId>, b: Option<NodeId>) -> Option<NodeId> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(self.join_nodes(a, b)),
        }
    }

    // =========================================================================
    // Tree boundary
    // =========================================================================

    /// Moves the subtree at `id` from `src` into `dst`, re-mapping child
    /// handles. Node contents move shallowly; keys are not copied.
    fn transplant(src: &mut NodeArena<K, S>, dst: &mut NodeArena<K, S>, id: NodeId) -> NodeId {
        let mut node = src.take(id);
        for child in node.children.iter_mut() {
            *child = Self::transplant(src, dst, *child);
        }
        dst.alloc(node)
    }

    fn extract_tree(&mut self, root: NodeId) -> Self {
        let mut out = Self::new();
        out.root = Self::transplant(&mut self.arena, &mut out.arena, root);
        out
    }

    // =========================================================================
    // Public structural API
    // =========================================================================

    /// Splits off and returns the tree of all entries with effective key
    /// strictly greater than `value`; `self` keeps the rest.
    pub fn split(&mut self, value: K) -> Self {
        if self.root == NodeId::NIL {
            return Self::new();
        }
        let (left, right) = self.split_root(self.root, value);
        self.root = left.unwrap_or(NodeId::NIL);
        match right {
            Some(r) => self.extract_tree(r),
            None => Self::new(),
        }
    }

    /// Absorbs `other`, every key of which must be strictly greater than
    /// every key of `self`. O(B·h) after a one-time node transplant.
    pub fn join(&mut self, mut other: Self) {
        if other.root == NodeId::NIL {
            return;
        }
        if self.root == NodeId::NIL {
            *self = other;
            return;
        }
        debug_assert!(
            self.get_max() < other.get_min(),
            "join requires every key of `other` to exceed every key of `self`"
        );
        let adopted = Self::transplant(&mut other.arena, &mut self.arena, other.root);
        other.root = NodeId::NIL;
        self.root = self.join_nodes(self.root, adopted);
    }

    /// Order-preserving union: absorbs `other`, concatenating satellite lists
    /// when both trees carry the same effective key (`self`'s satellites
    /// first).
    ///
    /// Linearizing pass over the two trees: repeatedly split the tree with
    /// the smaller minimum at the other's minimum, fold the at-most-one equal
    /// key, and append the strict prefix to the accumulator.
    pub fn merge(&mut self, mut other: Self) {
        if other.root == NodeId::NIL {
            return;
        }
        if self.root == NodeId::NIL {
            *self = other;
            return;
        }
        let adopted = Self::transplant(&mut other.arena, &mut self.arena, other.root);
        other.root = NodeId::NIL;

        let mut a = Some(self.root);
        let mut d = Some(adopted);
        let mut a_from_self = true;
        let mut acc: Option<NodeId> = None;
        self.root = NodeId::NIL;

        while let (Some(a_root), Some(d_root)) = (a, d) {
            let min_a = self.subtree_min(a_root);
            let min_d = self.subtree_min(d_root);
            let (a_root, d_root, min_d) = if min_d < min_a {
                a_from_self = !a_from_self;
                (d_root, a_root, min_a)
            } else {
                (a_root, d_root, min_d)
            };

            let (prefix, rest) = self.split_root(a_root, min_d);
            a = rest;
            d = Some(d_root);

            let mut prefix = prefix;
            if let Some(p_root) = prefix {
                let (less, equal) = self.split_root(p_root, min_d - K::ONE);
                prefix = less;
                if let Some(eq_root) = equal {
                    // the same position exists on both sides: fold the lists
                    let node = self.arena.take(eq_root);
                    debug_assert!(node.children.is_empty());
                    let mut eq_entry =
                        node.entries.into_iter().next().expect("exactly one equal key");
                    let hit = self.search_at(d_root, min_d).expect("min of D is present");
                    let target = &mut self.arena[hit.node].entries[hit.index].satellites;
                    if a_from_self {
                        eq_entry.satellites.append(target);
                        *target = eq_entry.satellites;
                    } else {
                        target.append(&mut eq_entry.satellites);
                    }
                }
            }
            acc = self.join_roots(acc, prefix);
        }

        let acc = self.join_roots(acc, a);
        let acc = self.join_roots(acc, d);
        self.root = acc.unwrap_or(NodeId::NIL);
    }
}
