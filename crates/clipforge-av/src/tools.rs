//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the ffmpeg and ffprobe executables, either
//! from configured paths or from `PATH`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clipforge_common::config::ToolsConfig;
use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// Tools the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Upper bound for a `-version` query.
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH`, preferring configured paths that
    /// exist. Tools that are not found are omitted.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom = match name {
                "ffmpeg" => config.ffmpeg_path.as_deref(),
                "ffprobe" => config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = match custom {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        tool = name,
                        path = %p.display(),
                        "Configured tool path does not exist; searching PATH"
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = name, path = %path.display(), "Found tool");
                    tools.insert(name.to_string(), path);
                }
                None => tracing::debug!(tool = name, "Tool not found"),
            }
        }

        Self { tools }
    }

    /// Path for `name`, falling back to the bare name.
    ///
    /// Running the bare name fails at spawn time, which the selector records
    /// as a tool-unavailable attempt instead of refusing the job outright.
    pub fn program(&self, name: &str) -> PathBuf {
        self.tools
            .get(name)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(name))
    }

    pub fn ffmpeg(&self) -> PathBuf {
        self.program("ffmpeg")
    }

    pub fn ffprobe(&self) -> PathBuf {
        self.program("ffprobe")
    }

    /// Check all known tools and return availability information.
    pub async fn check_all(&self) -> Vec<ToolInfo> {
        let mut infos = Vec::with_capacity(KNOWN_TOOLS.len());
        for &name in KNOWN_TOOLS {
            let info = match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path, VERSION_TIMEOUT).await,
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            };
            infos.push(info);
        }
        infos
    }
}

/// Run `<tool> -version` and return the first line of stdout.
///
/// A binary that hangs is killed after `timeout` and reports no version.
async fn detect_version(path: &Path, timeout: Duration) -> Option<String> {
    let mut cmd = ToolCommand::new(path.to_path_buf());
    cmd.arg("-version").timeout(timeout);

    let output = match cmd.run().await {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(path = %path.display(), "Version query failed: {e}");
            return None;
        }
    };
    if !output.success() {
        if output.timed_out {
            tracing::warn!(
                path = %path.display(),
                "`-version` did not answer within {:?}",
                timeout
            );
        }
        return None;
    }

    output.stdout.lines().next().map(|s| s.to_string())
}
