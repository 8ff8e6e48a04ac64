//! FFprobe-backed [`MediaProber`].
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and keeps the first video and audio stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clipforge_common::{Error, Result};
use serde::Deserialize;

use super::{parse_duration, parse_frame_rate, MediaInfo, MediaProber};
use crate::command::ToolCommand;
use crate::runner::ProcessRunner;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct FfprobeProber {
    runner: Arc<dyn ProcessRunner>,
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(runner: Arc<dyn ProcessRunner>, ffprobe_path: PathBuf) -> Self {
        Self {
            runner,
            ffprobe_path,
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(PROBE_TIMEOUT);
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.arg(path.to_string_lossy());

        let output = self.runner.run(&cmd).await?;
        if output.timed_out {
            return Err(Error::Probe(format!(
                "ffprobe timed out on {}",
                path.display()
            )));
        }
        if !output.success() {
            return Err(Error::Probe(format!(
                "ffprobe failed on {} (exit {:?})",
                path.display(),
                output.exit_code
            )));
        }

        let parsed: FfprobeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;
        Ok(parsed.into_media_info())
    }
}

impl std::fmt::Debug for FfprobeProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfprobeProber")
            .field("ffprobe_path", &self.ffprobe_path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    /// Matroska/WebM carry duration as an `HH:MM:SS.fff` tag instead.
    #[serde(rename = "DURATION")]
    duration: Option<String>,
}

impl FfprobeOutput {
    fn into_media_info(self) -> MediaInfo {
        let video = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));
        let audio = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));

        let duration_secs = video
            .and_then(stream_duration)
            .or_else(|| {
                self.format
                    .as_ref()
                    .and_then(|f| f.duration.as_deref())
                    .and_then(|d| d.parse::<f64>().ok())
            });

        MediaInfo {
            duration_secs,
            width: video.and_then(|v| v.width),
            height: video.and_then(|v| v.height),
            video_codec: video.and_then(|v| v.codec_name.clone()),
            audio_codec: audio.and_then(|a| a.codec_name.clone()),
            framerate: video
                .and_then(|v| v.r_frame_rate.as_deref())
                .and_then(parse_frame_rate),
        }
    }
}

fn stream_duration(stream: &FfprobeStream) -> Option<f64> {
    stream
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| stream.tags.duration.as_deref().and_then(parse_duration))
}
