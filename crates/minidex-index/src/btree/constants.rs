//! Constants for the shift B-tree.

/// Default branching factor: maximum number of keys per node.
pub const DEFAULT_BRANCHING: usize = 7;

/// Default minimum degree: every non-root node keeps at least
/// `DEFAULT_MIN_DEGREE - 1` keys.
pub const DEFAULT_MIN_DEGREE: usize = 3;

/// Node slots pre-allocated by `ShiftBTree::new`.
pub const INITIAL_ARENA_NODES: usize = 16;
