//! Utility modules for Lifelog.
//!
//! - [`files`]: Atomic writes and existence checks

pub mod files;
