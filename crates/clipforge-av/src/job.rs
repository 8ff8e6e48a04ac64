//! Transcode job inputs and outcomes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::encoders::{AccelerationMode, EncoderCandidate};

/// One rendition request. Built per invocation, never persisted.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Output height in pixels; width follows the source aspect ratio.
    pub height: u32,
    pub mode: AccelerationMode,
    /// Bound for each individual encoder attempt.
    pub timeout: Duration,
}

impl TranscodeJob {
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        height: u32,
        mode: AccelerationMode,
        timeout: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            height,
            mode,
            timeout,
        }
    }
}

/// Why a single candidate attempt did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// ffmpeg could not be started at all.
    ToolUnavailable { detail: String },
    /// ffmpeg ran but exited non-zero.
    EncoderUnsupported {
        exit_code: Option<i32>,
        detail: String,
    },
    /// The attempt exceeded the job's timeout and was killed.
    Timeout {
        #[serde(with = "secs")]
        after: Duration,
    },
}

impl AttemptFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolUnavailable { detail } => write!(f, "tool unavailable: {detail}"),
            Self::EncoderUnsupported { exit_code, detail } => {
                match exit_code {
                    Some(code) => write!(f, "exited with status {code}")?,
                    None => write!(f, "terminated by signal")?,
                }
                if !detail.is_empty() {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
            Self::Timeout { after } => write!(f, "timed out after {}s", after.as_secs_f64()),
        }
    }
}

/// A failed attempt, tagged with the candidate that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFailure {
    pub candidate: &'static str,
    pub video_codec: &'static str,
    pub reason: AttemptFailure,
}

impl CandidateFailure {
    pub fn new(candidate: &EncoderCandidate, reason: AttemptFailure) -> Self {
        Self {
            candidate: candidate.name,
            video_codec: candidate.video_codec,
            reason,
        }
    }
}

/// Outcome of a [`TranscodeJob`].
///
/// Exhausting every candidate is a normal outcome (`success == false`), not
/// an error.
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeResult {
    pub success: bool,
    pub mode: AccelerationMode,
    /// The candidate that produced the output.
    pub encoder: Option<&'static EncoderCandidate>,
    #[serde(with = "secs")]
    pub elapsed: Duration,
    /// Failed attempts in the order they were made. A successful job may
    /// still carry failures from candidates tried before the winner.
    pub failures: Vec<CandidateFailure>,
}

impl TranscodeResult {
    pub(crate) fn succeeded(
        mode: AccelerationMode,
        encoder: &'static EncoderCandidate,
        elapsed: Duration,
        failures: Vec<CandidateFailure>,
    ) -> Self {
        Self {
            success: true,
            mode,
            encoder: Some(encoder),
            elapsed,
            failures,
        }
    }

    pub(crate) fn exhausted(
        mode: AccelerationMode,
        elapsed: Duration,
        failures: Vec<CandidateFailure>,
    ) -> Self {
        Self {
            success: false,
            mode,
            encoder: None,
            elapsed,
            failures,
        }
    }

    /// Names of every candidate attempted, in order.
    pub fn attempted(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.failures.iter().map(|f| f.candidate).collect();
        if let Some(encoder) = self.encoder {
            names.push(encoder.name);
        }
        names
    }

    /// One-line description of the failures, for logs and CLI output.
    pub fn failure_summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{} ({})", f.candidate, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::SOFTWARE_CANDIDATES;

    #[test]
    fn attempted_lists_failures_then_winner() {
        let result = TranscodeResult::succeeded(
            AccelerationMode::Software,
            &SOFTWARE_CANDIDATES[1],
            Duration::from_secs(3),
            vec![CandidateFailure::new(
                &SOFTWARE_CANDIDATES[0],
                AttemptFailure::Timeout {
                    after: Duration::from_secs(1),
                },
            )],
        );
        assert_eq!(result.attempted(), vec!["h264-x264", "vp9-libvpx"]);
    }

    #[test]
    fn failure_display() {
        let unsupported = AttemptFailure::EncoderUnsupported {
            exit_code: Some(1),
            detail: "Unknown encoder 'h264_qsv'".into(),
        };
        assert_eq!(
            unsupported.to_string(),
            "exited with status 1: Unknown encoder 'h264_qsv'"
        );
        let timeout = AttemptFailure::Timeout {
            after: Duration::from_millis(1500),
        };
        assert_eq!(timeout.to_string(), "timed out after 1.5s");
        assert!(timeout.is_timeout());
    }

    #[test]
    fn result_serializes_to_json() {
        let result = TranscodeResult::exhausted(
            AccelerationMode::Hardware,
            Duration::from_millis(250),
            vec![CandidateFailure::new(
                &SOFTWARE_CANDIDATES[0],
                AttemptFailure::ToolUnavailable {
                    detail: "Tool not found: ffmpeg".into(),
                },
            )],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["mode"], "hardware");
        assert_eq!(json["elapsed"], 0.25);
        assert_eq!(json["failures"][0]["reason"]["kind"], "tool_unavailable");
    }
}
