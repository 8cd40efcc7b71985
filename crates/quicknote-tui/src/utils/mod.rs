//! Utility functions for string formatting.

pub mod format;

pub use format::{format_created_at, swipe_gutter, truncate_string};
