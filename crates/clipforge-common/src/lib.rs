//! clipforge-common: shared errors, configuration, and identifiers.
//!
//! This crate is the foundational dependency for the other clipforge crates,
//! providing the unified error type, the TOML-backed application
//! configuration, and content-derived video identifiers.

pub mod config;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::VideoId;
