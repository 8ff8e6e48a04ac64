//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! tool, transcode, artifact, and scan sections. Every section defaults
//! sensibly so a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable naming the source video directory.
pub const VIDEO_DIRECTORY_ENV: &str = "VIDEO_DIRECTORY";
/// Environment variable naming the data directory (derived artifacts live below it).
pub const DATA_DIRECTORY_ENV: &str = "DATA_DIRECTORY";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
    pub artifacts: ArtifactConfig,
    pub scan: ScanConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Apply `VIDEO_DIRECTORY` / `DATA_DIRECTORY` overrides from the process
    /// environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var_os(VIDEO_DIRECTORY_ENV).map(PathBuf::from),
            std::env::var_os(DATA_DIRECTORY_ENV).map(PathBuf::from),
        );
    }

    fn apply_overrides(&mut self, video_dir: Option<PathBuf>, data_dir: Option<PathBuf>) {
        if let Some(dir) = video_dir {
            self.scan.video_dir = dir;
        }
        if let Some(dir) = data_dir {
            self.scan.derived_dir = dir.join("derived");
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.transcode.heights.is_empty() && self.transcode.enabled {
            warnings.push("transcode.enabled is set but transcode.heights is empty".into());
        }
        for h in &self.transcode.heights {
            if *h == 0 || h % 2 != 0 {
                warnings.push(format!(
                    "transcode.heights contains {h}; heights must be positive and even"
                ));
            }
        }
        if self.transcode.timeout_secs == 0 {
            warnings.push("transcode.timeout_secs is 0; every encode will time out".into());
        }
        if self.transcode.capability_timeout_secs == 0 {
            warnings.push("transcode.capability_timeout_secs is 0".into());
        }

        if self.artifacts.poster_offset_secs < 0.0 {
            warnings.push("artifacts.poster_offset_secs is negative".into());
        }
        if self.artifacts.boomerang_clip_secs <= 0.0 {
            warnings.push("artifacts.boomerang_clip_secs must be positive".into());
        }
        if self.artifacts.boomerang_height == 0 || self.artifacts.boomerang_height % 2 != 0 {
            warnings.push(format!(
                "artifacts.boomerang_height {} must be positive and even",
                self.artifacts.boomerang_height
            ));
        }

        if self.scan.max_concurrent_jobs == 0 {
            warnings.push("scan.max_concurrent_jobs is 0; treated as 1".into());
        }
        if self.scan.extensions.is_empty() {
            warnings.push("scan.extensions is empty; no videos will be found".into());
        }
        if self.scan.video_dir == self.scan.derived_dir {
            warnings.push("scan.video_dir and scan.derived_dir are the same directory".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Rendition transcoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub enabled: bool,
    /// Prefer hardware encoders (software candidates remain as fallback).
    pub use_hardware: bool,
    /// Target rendition heights in pixels.
    pub heights: Vec<u32>,
    /// Upper bound for a single encoder attempt.
    pub timeout_secs: u64,
    /// Upper bound for the `ffmpeg -encoders` capability query.
    pub capability_timeout_secs: u64,
    /// Encoder identifier checked (advisory only) before hardware selection.
    pub baseline_hardware_encoder: String,
}

impl TranscodeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_hardware: false,
            heights: vec![720],
            timeout_secs: 3600,
            capability_timeout_secs: 5,
            baseline_hardware_encoder: "h264_nvenc".into(),
        }
    }
}

/// Poster and boomerang-preview settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub poster_offset_secs: f64,
    pub poster_max_width: u32,
    pub poster_max_height: u32,
    pub boomerang_clip_secs: f64,
    pub boomerang_height: u32,
    pub timeout_secs: u64,
    /// Rebuild artifacts even when the output file already exists.
    pub regenerate: bool,
}

impl ArtifactConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            poster_offset_secs: 0.0,
            poster_max_width: 1920,
            poster_max_height: 1080,
            boomerang_clip_secs: 1.5,
            boomerang_height: 360,
            timeout_secs: 120,
            regenerate: false,
        }
    }
}

/// Bulk scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub video_dir: PathBuf,
    pub derived_dir: PathBuf,
    /// File extensions (without the dot) treated as videos.
    pub extensions: Vec<String>,
    pub max_concurrent_jobs: usize,
    /// MiB of leading file content hashed into the video identifier.
    pub hash_window_mb: u64,
}

impl ScanConfig {
    /// Whether `path` carries one of the configured video extensions.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("./videos"),
            derived_dir: PathBuf::from("./data/derived"),
            extensions: vec!["mp4".into(), "mov".into(), "webm".into()],
            max_concurrent_jobs: 1,
            hash_window_mb: 16,
        }
    }
}
