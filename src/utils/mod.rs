//!
//! Utility module for the synchronizer.
//!
//! Formatting helpers shared by log lines across the crate.
/// Utility functions for formatting and display
pub mod format;

pub use format::{format_interval, short_address};
