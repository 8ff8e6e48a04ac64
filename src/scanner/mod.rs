//! Video library scanner.
//!
//! Walks the video directory and derives, per video, a poster frame, a
//! boomerang preview and the configured renditions into
//! `<derived_dir>/<video_id>/`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clipforge_av::{ArtifactStatus, CandidateFailure, MediaInfo};
use clipforge_common::VideoId;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::context::AppContext;

pub const POSTER_FILE: &str = "poster.jpg";
pub const PREVIEW_FILE: &str = "boomerang-preview.mp4";

/// File name of the rendition at `height`.
pub fn rendition_file(height: u32) -> String {
    format!("{height}p.mp4")
}

/// Outcome of a poster or preview step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Created,
    Skipped,
    Failed { reason: String },
}

impl StepOutcome {
    fn from_result(result: clipforge_common::Result<ArtifactStatus>) -> Self {
        match result {
            Ok(ArtifactStatus::Created) => Self::Created,
            Ok(ArtifactStatus::Skipped) => Self::Skipped,
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcome of one rendition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RenditionOutcome {
    Transcoded { encoder: &'static str },
    Exists,
    /// Every encoder candidate failed.
    Exhausted { failures: Vec<CandidateFailure> },
    Failed { reason: String },
}

impl RenditionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenditionReport {
    pub height: u32,
    pub target: PathBuf,
    pub outcome: RenditionOutcome,
}

/// Everything derived for one source video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub path: PathBuf,
    pub video_id: VideoId,
    pub media: Option<MediaInfo>,
    pub poster: StepOutcome,
    pub preview: StepOutcome,
    pub renditions: Vec<RenditionReport>,
}

impl VideoReport {
    pub fn is_ok(&self) -> bool {
        !self.poster.is_failed()
            && !self.preview.is_failed()
            && !self.renditions.iter().any(|r| r.outcome.is_failed())
    }
}

/// A video with the same content as one already in the sweep.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateVideo {
    pub path: PathBuf,
    /// The video whose derived directory this one shares.
    pub original: PathBuf,
    pub video_id: VideoId,
}

/// Totals for a sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub videos_found: usize,
    pub videos_ok: usize,
    pub videos_failed: usize,
    pub posters_created: usize,
    pub previews_created: usize,
    pub renditions_created: usize,
    pub reports: Vec<VideoReport>,
    /// Derived once, under the original's id.
    pub duplicates: Vec<DuplicateVideo>,
    /// Videos that could not be processed at all, with the reason.
    pub errors: Vec<(PathBuf, String)>,
}

impl ScanSummary {
    fn record(&mut self, report: VideoReport) {
        if report.is_ok() {
            self.videos_ok += 1;
        } else {
            self.videos_failed += 1;
        }
        if report.poster == StepOutcome::Created {
            self.posters_created += 1;
        }
        if report.preview == StepOutcome::Created {
            self.previews_created += 1;
        }
        self.renditions_created += report
            .renditions
            .iter()
            .filter(|r| matches!(r.outcome, RenditionOutcome::Transcoded { .. }))
            .count();
        self.reports.push(report);
    }

    fn record_error(&mut self, path: PathBuf, error: String) {
        self.videos_failed += 1;
        self.errors.push((path, error));
    }
}

/// Scanner for discovering videos and deriving their artifacts.
#[derive(Clone)]
pub struct Scanner {
    ctx: Arc<AppContext>,
    /// One lock per derived directory currently being written.
    in_progress: Arc<Mutex<HashMap<VideoId, Arc<AsyncMutex<()>>>>>,
}

impl Scanner {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            in_progress: Arc::default(),
        }
    }

    /// Supported video files under the video directory, sorted by path.
    pub fn discover(&self) -> Vec<PathBuf> {
        let scan = &self.ctx.config.scan;
        let mut videos: Vec<PathBuf> = WalkDir::new(&scan.video_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| !p.starts_with(&scan.derived_dir))
            .filter(|p| scan.is_supported(p))
            .collect();
        videos.sort();
        videos
    }

    /// Process every discovered video, up to `max_concurrent_jobs` at once.
    ///
    /// Videos are identified before any work starts; files sharing a
    /// [`VideoId`] are derived once and listed as duplicates. A failing video
    /// is recorded in the summary and never stops the sweep.
    pub async fn scan(&self) -> ScanSummary {
        let videos = self.discover();
        let limit = self.ctx.config.scan.max_concurrent_jobs.max(1);
        info!(
            "Scanning {} videos in {:?} ({} at a time)",
            videos.len(),
            self.ctx.config.scan.video_dir,
            limit
        );

        let mut summary = ScanSummary {
            videos_found: videos.len(),
            ..Default::default()
        };

        let mut originals: HashMap<VideoId, PathBuf> = HashMap::new();
        let mut unique = Vec::with_capacity(videos.len());
        for path in videos {
            let video_id = match self.identify(&path).await {
                Ok(id) => id,
                Err(e) => {
                    warn!("Failed to identify {:?}: {:#}", path, e);
                    summary.record_error(path, format!("{e:#}"));
                    continue;
                }
            };
            if let Some(original) = originals.get(&video_id) {
                info!(video_id = %video_id, "{:?} has the same content as {:?}", path, original);
                summary.duplicates.push(DuplicateVideo {
                    path,
                    original: original.clone(),
                    video_id,
                });
                continue;
            }
            originals.insert(video_id.clone(), path.clone());
            unique.push((path, video_id));
        }

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        for (path, video_id) in unique {
            let semaphore = semaphore.clone();
            let scanner = self.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let report = scanner.derive(&path, video_id).await;
                (path, report)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => summary.record(report),
                Ok((path, Err(e))) => {
                    warn!("Failed to scan {:?}: {:#}", path, e);
                    summary.record_error(path, format!("{e:#}"));
                }
                Err(e) => {
                    warn!("Scan task aborted: {e}");
                    summary.record_error(PathBuf::new(), e.to_string());
                }
            }
        }
        summary.reports.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            "Scan complete: {} found, {} ok, {} failed, {} duplicates, {} renditions created",
            summary.videos_found,
            summary.videos_ok,
            summary.videos_failed,
            summary.duplicates.len(),
            summary.renditions_created
        );
        summary
    }

    /// Derive every artifact for a single video.
    ///
    /// # Errors
    ///
    /// Only when the video cannot be identified or its derived directory
    /// cannot be created. Failed steps are recorded in the report.
    pub async fn scan_video(&self, path: &Path) -> Result<VideoReport> {
        let video_id = self.identify(path).await?;
        self.derive(path, video_id).await
    }

    async fn identify(&self, path: &Path) -> Result<VideoId> {
        if !path.is_file() {
            anyhow::bail!("Video does not exist: {:?}", path);
        }

        let window = self.ctx.config.scan.hash_window_mb;
        let id_path = path.to_path_buf();
        tokio::task::spawn_blocking(move || VideoId::from_file(&id_path, window))
            .await
            .context("Video hashing task failed")?
            .with_context(|| format!("Failed to identify {:?}", path))
    }

    async fn derive(&self, path: &Path, video_id: VideoId) -> Result<VideoReport> {
        // Same-content files map to one directory; never write it twice at once.
        let slot = self
            .in_progress
            .lock()
            .entry(video_id.clone())
            .or_default()
            .clone();
        let _guard = slot.lock().await;

        let config = &self.ctx.config;
        let dir = config.scan.derived_dir.join(video_id.as_str());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create derived directory {:?}", dir))?;
        debug!(video_id = %video_id, "Deriving into {:?}", dir);

        let media = match self.ctx.prober.probe(path).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Could not probe {:?}: {}", path, e);
                None
            }
        };

        let artifacts = &config.artifacts;
        let offset = poster_offset(artifacts.poster_offset_secs, media.as_ref());
        let poster = StepOutcome::from_result(
            self.ctx
                .artifacts
                .create_poster(path, &dir.join(POSTER_FILE), offset, artifacts.regenerate)
                .await,
        );
        let preview = StepOutcome::from_result(
            self.ctx
                .artifacts
                .create_boomerang_preview(
                    path,
                    &dir.join(PREVIEW_FILE),
                    artifacts.boomerang_clip_secs,
                    artifacts.regenerate,
                )
                .await,
        );

        let renditions = self.derive_renditions(path, &dir, media.as_ref()).await;

        let report = VideoReport {
            path: path.to_path_buf(),
            video_id,
            media,
            poster,
            preview,
            renditions,
        };
        if report.is_ok() {
            info!(video_id = %report.video_id, "Processed {:?}", path);
        } else {
            warn!(video_id = %report.video_id, "Processed {:?} with failures", path);
        }
        Ok(report)
    }

    async fn derive_renditions(
        &self,
        path: &Path,
        dir: &Path,
        media: Option<&MediaInfo>,
    ) -> Vec<RenditionReport> {
        let config = &self.ctx.config;
        if !config.transcode.enabled {
            return Vec::new();
        }
        let Some(source_height) = media.and_then(|m| m.height) else {
            warn!("Source height of {:?} unknown; skipping renditions", path);
            return Vec::new();
        };

        let mut heights = config.transcode.heights.clone();
        heights.sort_unstable();
        heights.dedup();

        let mut reports = Vec::new();
        for height in heights.into_iter().filter(|h| *h < source_height) {
            let target = dir.join(rendition_file(height));
            let outcome = if target.exists() && !config.artifacts.regenerate {
                RenditionOutcome::Exists
            } else {
                match self
                    .ctx
                    .transcoder
                    .transcode_to_height(path, &target, height, config.transcode.use_hardware)
                    .await
                {
                    Ok(result) => match result.encoder {
                        Some(encoder) => RenditionOutcome::Transcoded {
                            encoder: encoder.name,
                        },
                        None => RenditionOutcome::Exhausted {
                            failures: result.failures,
                        },
                    },
                    Err(e) => RenditionOutcome::Failed {
                        reason: e.to_string(),
                    },
                }
            };
            reports.push(RenditionReport {
                height,
                target,
                outcome,
            });
        }
        reports
    }
}

/// Seek offsets at or past the end of the clip would yield no frame.
fn poster_offset(configured: f64, media: Option<&MediaInfo>) -> f64 {
    match media.and_then(|m| m.duration_secs) {
        Some(duration) if configured >= duration => 0.0,
        _ => configured.max(0.0),
    }
}
