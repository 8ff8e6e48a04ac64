//! Process execution seam.
//!
//! Everything that shells out to ffmpeg goes through a [`ProcessRunner`] so
//! encoder selection and artifact generation can be driven by scripted
//! runners in tests.

use std::path::Path;

use async_trait::async_trait;
use clipforge_common::Result;

use crate::command::{ToolCommand, ToolOutput};

/// Runs a [`ToolCommand`] to completion or timeout.
///
/// Implementations report non-zero exits and timeouts through
/// [`ToolOutput`]. An `Err` means the process could not be started at all.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;
}

/// Runner backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        command.run().await
    }
}

/// Delete a partially written output file, if any.
pub fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove partial output: {e}"),
    }
}
