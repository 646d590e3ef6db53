//! Utility functions for common formatting.

pub mod formatting;

pub use formatting::truncate_id;
