//! Clipforge - video clip processing with sticky encoder selection
//!
//! This library crate exposes the application wiring for the binary and for
//! integration tests.

pub mod config;
pub mod context;
pub mod scanner;

pub use context::AppContext;
pub use scanner::{ScanSummary, Scanner, VideoReport};
