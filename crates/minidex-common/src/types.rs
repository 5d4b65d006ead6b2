//! Shared domain types for minidex.

use serde::{Deserialize, Serialize};

/// A position in a DNA sequence.
///
/// Positions are signed so that range shifts may move entries through
/// intermediate negative values without wrapping.
pub type SeqPos = i64;

/// A minimizer: the lexicographically smallest k-mer of a window, together
/// with the position at which it occurs.
///
/// This is the canonical satellite payload of the index; the index itself is
/// generic over the satellite type and never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minimizer {
    position: SeqPos,
    sequence: String,
}

impl Minimizer {
    /// Creates a minimizer for `sequence` occurring at `position`.
    pub fn new(position: SeqPos, sequence: impl Into<String>) -> Self {
        Self {
            position,
            sequence: sequence.into(),
        }
    }

    /// The position of the minimizer.
    pub fn position(&self) -> SeqPos {
        self.position
    }

    /// The k-mer sequence of the minimizer.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Moves the minimizer to a new position.
    pub fn set_position(&mut self, position: SeqPos) {
        self.position = position;
    }
}
