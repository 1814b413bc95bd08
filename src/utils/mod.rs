//! Utility functions
//!
//! Provides logging setup and human-readable formatting helpers.

pub mod format;
pub mod logging;

pub use format::format_file_size;
