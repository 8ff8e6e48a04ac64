//! Encoder selection with sticky reuse.
//!
//! Per acceleration mode the selector moves between two states:
//!
//! ```text
//!   Unresolved --first successful encode--> Pinned
//!   Pinned     --pinned candidate fails---> Unresolved
//! ```
//!
//! Detection and production share one path: a candidate is only pinned
//! after it has actually encoded the job's input.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::EncoderCache;
use crate::capability::CapabilityProber;
use crate::encoders::{transcode_command, AccelerationMode, CandidateTable, EncoderCandidate};
use crate::job::{AttemptFailure, CandidateFailure, TranscodeJob, TranscodeResult};
use crate::runner::{remove_partial_output, ProcessRunner};

/// Encoder checked before walking the hardware list when none is configured.
pub const DEFAULT_BASELINE_HARDWARE_ENCODER: &str = "h264_nvenc";

pub struct Selector {
    runner: Arc<dyn ProcessRunner>,
    prober: Arc<CapabilityProber>,
    cache: Arc<EncoderCache>,
    table: CandidateTable,
    ffmpeg: PathBuf,
    baseline_hardware_encoder: String,
}

impl Selector {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        prober: Arc<CapabilityProber>,
        cache: Arc<EncoderCache>,
        ffmpeg: PathBuf,
    ) -> Self {
        Self {
            runner,
            prober,
            cache,
            table: CandidateTable::builtin(),
            ffmpeg,
            baseline_hardware_encoder: DEFAULT_BASELINE_HARDWARE_ENCODER.to_string(),
        }
    }

    pub fn with_baseline_hardware_encoder(mut self, encoder: impl Into<String>) -> Self {
        self.baseline_hardware_encoder = encoder.into();
        self
    }

    pub fn cache(&self) -> &Arc<EncoderCache> {
        &self.cache
    }

    pub fn prober(&self) -> &Arc<CapabilityProber> {
        &self.prober
    }

    pub fn table(&self) -> &CandidateTable {
        &self.table
    }

    /// Encode `job`, reusing the pinned candidate when there is one.
    ///
    /// Never fails: exhausting every candidate yields a result with
    /// `success == false` listing each attempt.
    pub async fn transcode(&self, job: &TranscodeJob) -> TranscodeResult {
        let started = Instant::now();
        let mode = job.mode;
        let mut failures: Vec<CandidateFailure> = Vec::new();

        // Fast path: no gate, the pinned candidate is tried directly.
        if let Some(pinned) = self.cache.pinned(mode) {
            match self.attempt(pinned, job).await {
                Ok(()) => {
                    return TranscodeResult::succeeded(mode, pinned, started.elapsed(), failures)
                }
                Err(reason) => self.demote(mode, pinned, reason, &mut failures),
            }
        }

        let _gate = self.cache.selection_gate(mode).await;

        // Another job may have pinned a candidate while this one waited.
        if let Some(pinned) = self.cache.pinned(mode) {
            if !tried(&failures, pinned) {
                match self.attempt(pinned, job).await {
                    Ok(()) => {
                        return TranscodeResult::succeeded(
                            mode,
                            pinned,
                            started.elapsed(),
                            failures,
                        )
                    }
                    Err(reason) => self.demote(mode, pinned, reason, &mut failures),
                }
            }
        }

        if mode == AccelerationMode::Hardware {
            self.check_hardware_baseline().await;
        }

        for candidate in self.table.candidates(mode) {
            if tried(&failures, candidate) {
                continue;
            }
            match self.attempt(candidate, job).await {
                Ok(()) => {
                    self.cache.pin(mode, candidate);
                    return TranscodeResult::succeeded(
                        mode,
                        candidate,
                        started.elapsed(),
                        failures,
                    );
                }
                Err(reason) => failures.push(CandidateFailure::new(candidate, reason)),
            }
        }

        TranscodeResult::exhausted(mode, started.elapsed(), failures)
    }

    /// Run one candidate against the job. Any failure leaves no file at the
    /// target path.
    async fn attempt(
        &self,
        candidate: &'static EncoderCandidate,
        job: &TranscodeJob,
    ) -> Result<(), AttemptFailure> {
        let cmd = transcode_command(
            &self.ffmpeg,
            candidate,
            &job.source,
            &job.target,
            job.height,
            job.timeout,
        );
        tracing::debug!(encoder = candidate.name, command = %cmd, "Trying encoder candidate");

        let reason = match self.runner.run(&cmd).await {
            Ok(out) if out.success() => {
                tracing::debug!(
                    encoder = candidate.name,
                    elapsed_ms = out.elapsed.as_millis() as u64,
                    "Encoder candidate succeeded"
                );
                return Ok(());
            }
            Ok(out) if out.timed_out => AttemptFailure::Timeout { after: job.timeout },
            Ok(out) => AttemptFailure::EncoderUnsupported {
                exit_code: out.exit_code,
                detail: out.stderr_tail(3),
            },
            Err(e) => AttemptFailure::ToolUnavailable {
                detail: e.to_string(),
            },
        };

        remove_partial_output(&job.target);

        if reason.is_timeout() {
            tracing::warn!(
                encoder = candidate.name,
                video_codec = candidate.video_codec,
                timeout_secs = job.timeout.as_secs_f64(),
                source = %job.source.display(),
                "Encoder candidate timed out; process tree killed"
            );
        } else {
            tracing::warn!(
                encoder = candidate.name,
                video_codec = candidate.video_codec,
                source = %job.source.display(),
                "Encoder candidate failed: {reason}"
            );
        }
        Err(reason)
    }

    fn demote(
        &self,
        mode: AccelerationMode,
        pinned: &'static EncoderCandidate,
        reason: AttemptFailure,
        failures: &mut Vec<CandidateFailure>,
    ) {
        if self.cache.unpin_if(mode, pinned) {
            tracing::info!(
                mode = %mode,
                encoder = pinned.name,
                "Pinned encoder failed; reselecting"
            );
        }
        failures.push(CandidateFailure::new(pinned, reason));
    }

    async fn check_hardware_baseline(&self) {
        if !self.prober.is_available(&self.baseline_hardware_encoder).await {
            tracing::warn!(
                encoder = %self.baseline_hardware_encoder,
                "Hardware encoder not advertised by ffmpeg; attempting hardware candidates anyway"
            );
        }
    }
}

fn tried(failures: &[CandidateFailure], candidate: &EncoderCandidate) -> bool {
    failures.iter().any(|f| f.candidate == candidate.name)
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("ffmpeg", &self.ffmpeg)
            .field("table", &self.table)
            .field("baseline_hardware_encoder", &self.baseline_hardware_encoder)
            .finish_non_exhaustive()
    }
}
