//! Utility functions for money and string formatting.

pub mod format;

pub use format::{format_date, format_rupiah, parse_rupiah, truncate_string};
