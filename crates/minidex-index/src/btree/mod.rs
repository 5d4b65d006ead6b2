//! Augmented B-tree with lazy subtree shifts.
//!
//! The tree maps signed integer keys (genomic positions) to insertion-ordered
//! satellite lists, and supports point operations, a sub-linear range shift,
//! and structural split/join/merge — the primitives a dynamic minimizer index
//! needs to track positions through sequence edits without rebuilding.
//!
//! ## Node layout
//!
//! Nodes live in a typed arena addressed by 32-bit handles:
//!
//! ```text
//! +---------------------------+
//! | entries: Vec<KeyEntry>    |  <= B keys, sorted by stored value
//! |   value: K  (stored)      |
//! |   satellites: Vec<S>      |
//! +---------------------------+
//! | children: Vec<NodeId>     |  empty (leaf) or entries.len() + 1
//! +---------------------------+
//! | shift: K                  |  lazily applies to the whole subtree
//! +---------------------------+
//! ```
//!
//! The *effective* value of a key is its stored value plus the sum of `shift`
//! from the root down to and including its node. `shift_greater` adds its
//! delta to O(B) stored keys per level and to O(1) child shifts per level,
//! which is what makes range shifts sub-linear; every structural move of a
//! key or subtree across node boundaries re-bases it so effective values are
//! preserved.
//!
//! ## Defaults
//!
//! Branching factor 7 and minimum degree 3, matching the index workload; both
//! are const parameters (`2 <= T <= B`).

// Submodules
pub mod arena;
pub mod constants;
pub mod entry;
pub mod iter;
pub mod node;
pub mod structural;
pub mod tree;

// Re-exports for public API
pub use constants::{DEFAULT_BRANCHING, DEFAULT_MIN_DEGREE};
pub use entry::{EntryRef, RemovedEntry, ShiftKey};
pub use iter::Iter;
pub use tree::ShiftBTree;
