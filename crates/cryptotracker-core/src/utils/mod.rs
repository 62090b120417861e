//! Utility functions for display formatting and local search.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    contains_ignore_case, filter_coins, format_change, format_compact, format_price, truncate,
};
