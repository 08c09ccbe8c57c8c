//! Lifelog Core — shared errors and file utilities.
//!
//! This crate provides the foundational types used across all Lifelog crates.
//! It has no internal Lifelog dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`util`]: Staged and atomic file writes, path checks

pub mod error;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};

// Convenience re-exports from util
pub use util::files::{StagedWrite, missing_paths, stage_write, write_atomic};
