//! In-order traversal.
//!
//! The iterator keeps an explicit stack of `(node, next entry index,
//! accumulated shift above the node)` frames, so accumulated shifts propagate
//! across the walk without re-descending. O(n) total, O(h) peak stack depth.
//! Borrowing the tree read-only, it is invalidated by any mutation.

use std::iter::FusedIterator;

use super::arena::NodeId;
use super::entry::ShiftKey;
use super::tree::ShiftBTree;

/// In-order iterator over `(effective key, satellite list)` pairs.
pub struct Iter<'a, K, S, const B: usize, const T: usize> {
    tree: &'a ShiftBTree<K, S, B, T>,
    stack: Vec<(NodeId, usize, K)>,
}

impl<'a, K: ShiftKey, S, const B: usize, const T: usize> Iter<'a, K, S, B, T> {
    fn new(tree: &'a ShiftBTree<K, S, B, T>) -> Self {
        let mut stack = Vec::new();
        if tree.root != NodeId::NIL {
            Self::descend_leftmost(tree, &mut stack, tree.root, K::ZERO);
        }
        Self { tree, stack }
    }

    fn descend_leftmost(
        tree: &'a ShiftBTree<K, S, B, T>,
        stack: &mut Vec<(NodeId, usize, K)>,
        mut id: NodeId,
        mut above: K,
    ) {
        loop {
            stack.push((id, 0, above));
            let node = &tree.arena[id];
            if node.is_leaf() {
                return;
            }
            above = above + node.shift;
            id = node.children[0];
        }
    }
}

impl<'a, K: ShiftKey, S, const B: usize, const T: usize> Iterator for Iter<'a, K, S, B, T> {
    type Item = (K, &'a [S]);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        // pop frames whose entries are exhausted
        loop {
            let &(id, index, _) = self.stack.last()?;
            if index < tree.arena[id].len() {
                break;
            }
            self.stack.pop();
        }

        let frame = self.stack.last_mut()?;
        let (id, index, above) = *frame;
        frame.1 += 1;

        let node = &tree.arena[id];
        let value = node.entries[index].value + node.shift + above;
        let satellites: &'a [S] = &node.entries[index].satellites;
        if !node.is_leaf() {
            // the subtree between this entry and the next comes first
            let child = node.children[index + 1];
            Self::descend_leftmost(tree, &mut self.stack, child, above + node.shift);
        }
        Some((value, satellites))
    }
}

impl<K: ShiftKey, S, const B: usize, const T: usize> FusedIterator for Iter<'_, K, S, B, T> {}

impl<K: ShiftKey, S, const B: usize, const T: usize> ShiftBTree<K, S, B, T> {
    /// Iterates the entries in ascending effective-key order.
    pub fn iter(&self) -> Iter<'_, K, S, B, T> {
        Iter::new(self)
    }
}

impl<'a, K: ShiftKey, S, const B: usize, const T: usize> IntoIterator
    for &'a ShiftBTree<K, S, B, T>
{
    type Item = (K, &'a [S]);
    type IntoIter = Iter<'a, K, S, B, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_empty() {
        let tree: ShiftBTree<i64, u8> = ShiftBTree::new();
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn test_iter_yields_sorted_effective_keys() {
        let mut tree: ShiftBTree<i64, &'static str, 3, 2> = ShiftBTree::new();
        for v in [9, 1, 5, 3, 7, 2, 8, 4, 6] {
            tree.insert(v, "s");
        }
        let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_sees_root_shift() {
        let mut tree: ShiftBTree<i64, u8> = ShiftBTree::new();
        tree.insert(1, 0);
        tree.insert(2, 1);
        tree.shift(100);
        let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![101, 102]);
    }

    #[test]
    fn test_iter_satellite_lists() {
        let mut tree: ShiftBTree<i64, char> = ShiftBTree::new();
        tree.insert(4, 'a');
        tree.insert(4, 'b');
        tree.insert(2, 'c');
        let collected: Vec<(i64, Vec<char>)> =
            tree.iter().map(|(k, s)| (k, s.to_vec())).collect();
        assert_eq!(collected, vec![(2, vec!['c']), (4, vec!['a', 'b'])]);
    }

    #[test]
    fn test_iter_visits_each_entry_once_in_deep_tree() {
        let mut tree: ShiftBTree<i64, i64, 3, 2> = ShiftBTree::new();
        for v in 0..200 {
            tree.insert(v, v);
        }
        let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, (0..200).collect::<Vec<_>>());
    }
}
