//! Utilities for schemift
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{
    backup_name, format_name, get_constraint_name, get_index_name, truncate_identifier,
};
