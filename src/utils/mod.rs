//! Utility functions module
//!
//! This module contains filesystem discovery helpers, output formatting,
//! and the bounded value rendering used in error messages.

pub mod discovery;
pub mod format;
pub mod repr;

pub use discovery::*;
pub use format::*;
pub use repr::*;
