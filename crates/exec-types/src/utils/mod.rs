//! Utility functions for string formatting.

pub mod formatting;

pub use formatting::{format_units, truncate_id, with_0x_prefix};
