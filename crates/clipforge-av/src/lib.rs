//! # clipforge-av
//!
//! Encoder selection, transcoding, and derived-artifact generation over the
//! ffmpeg CLI.
//!
//! This crate provides:
//!
//! - **Command execution** ([`ToolCommand`], [`ProcessRunner`]) -- async
//!   builder with timeout and process-tree termination, behind a runner
//!   trait so tests can script outcomes.
//! - **Capability probing** ([`CapabilityProber`]) -- cached answers to
//!   "does this ffmpeg build advertise encoder X".
//! - **Encoder selection** ([`Selector`], [`EncoderCache`]) -- ordered
//!   fallback over [`CandidateTable`] with a sticky per-mode pin.
//! - **Transcoding** ([`Transcoder`]) -- the rendition entry point.
//! - **Artifacts** ([`ArtifactGenerator`]) -- poster frames and boomerang
//!   previews.
//! - **Tool discovery and probing** ([`ToolRegistry`], [`probe`]).

pub mod artifacts;
pub mod cache;
pub mod capability;
pub mod command;
pub mod encoders;
pub mod job;
pub mod probe;
pub mod runner;
pub mod selector;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use artifacts::{ArtifactGenerator, ArtifactStatus};
pub use cache::{EncoderCache, SlotState};
pub use capability::CapabilityProber;
pub use command::{ToolCommand, ToolOutput};
pub use encoders::{AccelerationMode, CandidateTable, EncoderCandidate};
pub use job::{AttemptFailure, CandidateFailure, TranscodeJob, TranscodeResult};
pub use probe::{FfprobeProber, MediaInfo, MediaProber};
pub use runner::{ProcessRunner, SystemRunner};
pub use selector::Selector;
pub use tools::{ToolInfo, ToolRegistry};
pub use transcode::Transcoder;
