//! Poster frames and boomerang previews.
//!
//! Each artifact is a single bounded ffmpeg call with a fixed encoder; these
//! do not go through encoder selection.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clipforge_common::config::ArtifactConfig;
use clipforge_common::{Error, Result};
use serde::Serialize;

use crate::command::ToolCommand;
use crate::runner::{remove_partial_output, ProcessRunner};

/// Whether an artifact call produced a file or found one already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Created,
    Skipped,
}

pub struct ArtifactGenerator {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg: PathBuf,
    timeout: Duration,
    poster_max_width: u32,
    poster_max_height: u32,
    boomerang_height: u32,
}

impl ArtifactGenerator {
    pub fn new(runner: Arc<dyn ProcessRunner>, ffmpeg: PathBuf, config: &ArtifactConfig) -> Self {
        Self {
            runner,
            ffmpeg,
            timeout: config.timeout(),
            poster_max_width: config.poster_max_width,
            poster_max_height: config.poster_max_height,
            boomerang_height: config.boomerang_height,
        }
    }

    /// Extract one frame at `offset_secs`, scaled down to fit the configured
    /// bounds. Never upscales.
    pub async fn create_poster(
        &self,
        source: &Path,
        out: &Path,
        offset_secs: f64,
        regenerate: bool,
    ) -> Result<ArtifactStatus> {
        if skip_existing("poster", out, regenerate) {
            return Ok(ArtifactStatus::Skipped);
        }
        check_source(source)?;
        if !offset_secs.is_finite() || offset_secs < 0.0 {
            return Err(Error::Validation(format!(
                "poster offset must be a non-negative number of seconds, got {offset_secs}"
            )));
        }

        let cmd = self.poster_command(source, out, offset_secs);
        self.produce("poster", source, out, &cmd).await
    }

    /// Take the first `clip_secs` seconds, append them reversed, scale to
    /// the configured height and drop audio.
    pub async fn create_boomerang_preview(
        &self,
        source: &Path,
        out: &Path,
        clip_secs: f64,
        regenerate: bool,
    ) -> Result<ArtifactStatus> {
        if skip_existing("boomerang preview", out, regenerate) {
            return Ok(ArtifactStatus::Skipped);
        }
        check_source(source)?;
        if !clip_secs.is_finite() || clip_secs <= 0.0 {
            return Err(Error::Validation(format!(
                "preview clip duration must be positive, got {clip_secs}"
            )));
        }

        let cmd = self.boomerang_command(source, out, clip_secs);
        self.produce("boomerang preview", source, out, &cmd).await
    }

    fn poster_command(&self, source: &Path, out: &Path, offset_secs: f64) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-hide_banner", "-nostdin", "-v", "error", "-y"]);
        cmd.arg("-ss").arg(format!("{offset_secs:.3}"));
        cmd.arg("-i").arg(source.to_string_lossy());
        cmd.args(["-frames:v", "1"]);
        cmd.arg("-vf").arg(format!(
            "scale='min({w},iw)':'min({h},ih)':force_original_aspect_ratio=decrease",
            w = self.poster_max_width,
            h = self.poster_max_height,
        ));
        cmd.args(["-q:v", "2"]);
        cmd.arg(out.to_string_lossy());
        cmd
    }

    fn boomerang_command(&self, source: &Path, out: &Path, clip_secs: f64) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-hide_banner", "-nostdin", "-v", "error", "-y"]);
        cmd.arg("-t").arg(format!("{clip_secs:.3}"));
        cmd.arg("-i").arg(source.to_string_lossy());
        cmd.arg("-filter_complex").arg(format!(
            "[0:v]scale=-2:{h},split[fwd][tmp];[tmp]reverse[rev];[fwd][rev]concat=n=2:v=1:a=0,format=yuv420p[out]",
            h = self.boomerang_height,
        ));
        cmd.args(["-map", "[out]", "-an"]);
        cmd.args(["-c:v", "libx264", "-preset", "veryfast", "-crf", "28"]);
        cmd.args(["-movflags", "+faststart"]);
        cmd.arg(out.to_string_lossy());
        cmd
    }

    async fn produce(
        &self,
        kind: &str,
        source: &Path,
        out: &Path,
        cmd: &ToolCommand,
    ) -> Result<ArtifactStatus> {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!(kind, command = %cmd, "Generating artifact");

        let output = match self.runner.run(cmd).await {
            Ok(output) => output,
            Err(e) => {
                remove_partial_output(out);
                return Err(e);
            }
        };

        if output.success() && !out.is_file() {
            // e.g. a poster seek past the last frame
            let message = format!("{kind} exited cleanly but wrote no output");
            tracing::warn!(source = %source.display(), out = %out.display(), "{message}");
            return Err(Error::tool(cmd.program_name(), message));
        }
        if output.success() {
            tracing::info!(
                kind,
                source = %source.display(),
                out = %out.display(),
                elapsed_ms = output.elapsed.as_millis() as u64,
                "Artifact created"
            );
            return Ok(ArtifactStatus::Created);
        }

        remove_partial_output(out);
        let message = if output.timed_out {
            format!("{kind} timed out after {}s", self.timeout.as_secs_f64())
        } else {
            format!(
                "{kind} failed with status {}: {}",
                output
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".into()),
                output.stderr_tail(3)
            )
        };
        tracing::warn!(source = %source.display(), "{message}");
        Err(Error::tool(cmd.program_name(), message))
    }
}

impl std::fmt::Debug for ArtifactGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactGenerator")
            .field("ffmpeg", &self.ffmpeg)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn skip_existing(kind: &str, out: &Path, regenerate: bool) -> bool {
    if out.exists() && !regenerate {
        tracing::debug!(kind, out = %out.display(), "Artifact exists; skipping");
        return true;
    }
    false
}

fn check_source(source: &Path) -> Result<()> {
    if source.is_file() {
        Ok(())
    } else {
        Err(Error::not_found("source video", source.display()))
    }
}
