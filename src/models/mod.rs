//! Argument models for the cache facade
//!
//! Shapes accepted by the batch operations.

pub mod batch;

// Re-export commonly used types
pub use batch::{Keys, MsetEntry};
