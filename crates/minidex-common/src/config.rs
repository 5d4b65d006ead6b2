//! Configuration structures for minidex.

use crate::error::{MinidexError, Result};
use serde::{Deserialize, Serialize};

/// Default number of node slots pre-allocated per index arena.
pub const DEFAULT_NODE_CAPACITY: usize = 1024;

/// Configuration for a minimizer index instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of node slots pre-allocated in the node arena.
    pub initial_node_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_node_capacity: DEFAULT_NODE_CAPACITY, // ~enough for 20k keys at B=7
        }
    }
}

impl IndexConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.initial_node_capacity == 0 {
            return Err(MinidexError::InvalidParameter {
                name: "initial_node_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
