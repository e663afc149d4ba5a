//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{format_age, single_line, truncate_string};
