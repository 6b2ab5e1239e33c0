//! Core infrastructure for the oblivtree evaluation engine.
//!
//! This module provides the foundational components shared by the rest of
//! the crate:
//!
//! - [`types`]: Fundamental data types and aliases
//! - [`constants`]: Capacity limits and layout constants
//! - [`error`]: Error handling and error types

// Public module declarations
pub mod constants;
pub mod error;
pub mod types;
