//! Minidex index core: an augmented B-tree with lazy subtree shifts.
//!
//! This crate provides the dynamic set at the heart of the minidex minimizer
//! index. Entries are `(position, satellite list)` pairs keyed by signed
//! integer genomic position; beyond the usual point operations the tree
//! offers a sub-linear `shift_greater` (add a signed offset to every key at
//! or beyond a threshold), `split`/`join` around a pivot, and an
//! order-preserving `merge` — the operations a variation-aware minimizer
//! driver issues as sequence edits move downstream positions around.
//!
//! ```
//! use minidex_index::MinimizerIndex;
//!
//! let mut index: MinimizerIndex<&str> = MinimizerIndex::new();
//! index.insert(4, "ACGT");
//! index.insert(11, "CATT");
//! // a 3-base insertion upstream of position 11 shifts everything behind it
//! index.shift_greater(11, 3);
//! assert!(index.search(14).is_some());
//! ```

pub mod btree;

pub use btree::{EntryRef, Iter, RemovedEntry, ShiftBTree, ShiftKey};
pub use btree::{DEFAULT_BRANCHING, DEFAULT_MIN_DEGREE};

use minidex_common::SeqPos;

/// The index instantiation used by the minimizer driver: positions are
/// [`SeqPos`], satellites are caller-chosen (typically the minimizer k-mer).
pub type MinimizerIndex<S> = ShiftBTree<SeqPos, S>;
