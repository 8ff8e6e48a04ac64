//! Rendition transcoding entry point.

use std::path::Path;
use std::time::Duration;

use clipforge_common::{Error, Result};

use crate::encoders::AccelerationMode;
use crate::job::{TranscodeJob, TranscodeResult};
use crate::selector::Selector;

/// Validates jobs, hands them to the [`Selector`], and logs one summary line
/// per job.
#[derive(Debug)]
pub struct Transcoder {
    selector: Selector,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(selector: Selector, timeout: Duration) -> Self {
        Self { selector, timeout }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Encode `source` into `target` at `height` rows.
    ///
    /// # Errors
    ///
    /// Only invalid input or I/O faults while preparing the target directory
    /// are errors. A job where no encoder worked returns `Ok` with
    /// `success == false`.
    pub async fn transcode_to_height(
        &self,
        source: &Path,
        target: &Path,
        height: u32,
        use_hardware: bool,
    ) -> Result<TranscodeResult> {
        let job = TranscodeJob::new(
            source,
            target,
            height,
            AccelerationMode::from_preference(use_hardware),
            self.timeout,
        );
        self.run_job(&job).await
    }

    /// Run a fully specified job.
    pub async fn run_job(&self, job: &TranscodeJob) -> Result<TranscodeResult> {
        validate(job)?;
        if let Some(parent) = job.target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(
            source = %job.source.display(),
            target = %job.target.display(),
            height = job.height,
            mode = %job.mode,
            "Transcode started"
        );

        let result = self.selector.transcode(job).await;

        if let Some(encoder) = result.encoder {
            tracing::info!(
                source = %job.source.display(),
                encoder = encoder.name,
                video_codec = encoder.video_codec,
                failed_attempts = result.failures.len(),
                elapsed_ms = result.elapsed.as_millis() as u64,
                "Transcode complete"
            );
        } else {
            tracing::warn!(
                source = %job.source.display(),
                mode = %job.mode,
                attempts = result.failures.len(),
                elapsed_ms = result.elapsed.as_millis() as u64,
                "All encoder candidates failed: {}",
                result.failure_summary()
            );
        }

        Ok(result)
    }

    /// Reset every pinned encoder so the next job reselects.
    pub fn clear_encoder_cache(&self) {
        self.selector.cache().clear_all();
    }

    /// Forget every cached capability answer.
    pub fn clear_capability_cache(&self) {
        self.selector.prober().clear();
    }
}

fn validate(job: &TranscodeJob) -> Result<()> {
    if !job.source.is_file() {
        return Err(Error::not_found("source video", job.source.display()));
    }
    if job.height == 0 {
        return Err(Error::Validation("height must be positive".into()));
    }
    if job.source == job.target {
        return Err(Error::Validation(format!(
            "target path {} is the source video",
            job.target.display()
        )));
    }
    if job.timeout.is_zero() {
        return Err(Error::Validation("timeout must be positive".into()));
    }
    Ok(())
}
