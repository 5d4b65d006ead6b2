//! Minidex common types, errors, and utilities.
//!
//! This crate provides shared definitions used across all minidex components.

pub mod config;
pub mod error;
pub mod types;

pub use config::IndexConfig;
pub use error::{MinidexError, Result};
pub use types::{Minimizer, SeqPos};
