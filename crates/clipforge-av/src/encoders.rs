//! Encoder candidate table.
//!
//! Each [`EncoderCandidate`] is one concrete ffmpeg configuration. Candidates
//! are listed in priority order per [`AccelerationMode`]; the selector tries
//! them in that order against the real input.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// Whether hardware-assisted or software-only encoding is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelerationMode {
    Hardware,
    Software,
}

impl AccelerationMode {
    pub const ALL: [AccelerationMode; 2] = [AccelerationMode::Hardware, AccelerationMode::Software];

    pub fn from_preference(use_hardware: bool) -> Self {
        if use_hardware {
            Self::Hardware
        } else {
            Self::Software
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::Software => "software",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Hardware => 0,
            Self::Software => 1,
        }
    }
}

impl fmt::Display for AccelerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete encoder configuration considered during selection.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct EncoderCandidate {
    /// Human-readable identifier, unique within a table.
    pub name: &'static str,
    /// ffmpeg video encoder (`-c:v`).
    pub video_codec: &'static str,
    /// ffmpeg audio encoder (`-c:a`).
    pub audio_codec: &'static str,
    /// Audio bitrate (`-b:a`).
    pub audio_bitrate: &'static str,
    /// Quality/rate-control arguments placed right after `-c:v`.
    pub extra_args: &'static [&'static str],
    /// Output container extension.
    pub container: &'static str,
    pub acceleration: AccelerationMode,
}

/// Hardware candidates, highest priority first.
pub static HARDWARE_CANDIDATES: &[EncoderCandidate] = &[
    EncoderCandidate {
        name: "av1-nvenc",
        video_codec: "av1_nvenc",
        audio_codec: "libopus",
        audio_bitrate: "96k",
        extra_args: &["-preset", "p4", "-cq", "30"],
        container: "mp4",
        acceleration: AccelerationMode::Hardware,
    },
    EncoderCandidate {
        name: "h264-nvenc",
        video_codec: "h264_nvenc",
        audio_codec: "aac",
        audio_bitrate: "128k",
        extra_args: &["-preset", "p4", "-rc", "vbr", "-cq", "23"],
        container: "mp4",
        acceleration: AccelerationMode::Hardware,
    },
    EncoderCandidate {
        name: "h264-qsv",
        video_codec: "h264_qsv",
        audio_codec: "aac",
        audio_bitrate: "128k",
        extra_args: &["-preset", "medium", "-global_quality", "23"],
        container: "mp4",
        acceleration: AccelerationMode::Hardware,
    },
];

/// Software candidates, highest priority first. Also the fallback tail of
/// hardware mode.
pub static SOFTWARE_CANDIDATES: &[EncoderCandidate] = &[
    EncoderCandidate {
        name: "h264-x264",
        video_codec: "libx264",
        audio_codec: "aac",
        audio_bitrate: "128k",
        extra_args: &["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"],
        container: "mp4",
        acceleration: AccelerationMode::Software,
    },
    EncoderCandidate {
        name: "vp9-libvpx",
        video_codec: "libvpx-vp9",
        audio_codec: "libopus",
        audio_bitrate: "96k",
        extra_args: &["-crf", "31", "-b:v", "0", "-row-mt", "1", "-cpu-used", "4"],
        container: "mp4",
        acceleration: AccelerationMode::Software,
    },
    EncoderCandidate {
        name: "av1-svt",
        video_codec: "libsvtav1",
        audio_codec: "libopus",
        audio_bitrate: "96k",
        extra_args: &["-crf", "32", "-preset", "8"],
        container: "mp4",
        acceleration: AccelerationMode::Software,
    },
];

/// Ordered candidate lists per acceleration mode.
#[derive(Debug, Clone, Copy)]
pub struct CandidateTable {
    hardware: &'static [EncoderCandidate],
    software: &'static [EncoderCandidate],
}

impl CandidateTable {
    pub const fn new(
        hardware: &'static [EncoderCandidate],
        software: &'static [EncoderCandidate],
    ) -> Self {
        Self { hardware, software }
    }

    /// The compiled-in table.
    pub const fn builtin() -> Self {
        Self::new(HARDWARE_CANDIDATES, SOFTWARE_CANDIDATES)
    }

    /// Candidates consulted for `mode`, in attempt order.
    ///
    /// Hardware mode tries every hardware candidate and then falls through to
    /// the software list.
    pub fn candidates(
        &self,
        mode: AccelerationMode,
    ) -> impl Iterator<Item = &'static EncoderCandidate> + '_ {
        let hardware: &'static [EncoderCandidate] = match mode {
            AccelerationMode::Hardware => self.hardware,
            AccelerationMode::Software => &[],
        };
        hardware.iter().chain(self.software.iter())
    }

    pub fn len(&self, mode: AccelerationMode) -> usize {
        self.candidates(mode).count()
    }
}

impl Default for CandidateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Build the ffmpeg invocation that encodes `source` into `target` with
/// `candidate`, scaled to `height` rows.
pub fn transcode_command(
    ffmpeg: &Path,
    candidate: &EncoderCandidate,
    source: &Path,
    target: &Path,
    height: u32,
    timeout: Duration,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.timeout(timeout);
    cmd.args(["-hide_banner", "-nostdin", "-v", "error", "-y"]);
    cmd.arg("-i").arg(source.to_string_lossy());
    cmd.args(["-c:v", candidate.video_codec]);
    cmd.args(candidate.extra_args.iter().copied());
    cmd.arg("-vf").arg(format!("scale=-2:{height}"));
    cmd.args(["-c:a", candidate.audio_codec, "-b:a", candidate.audio_bitrate]);
    if candidate.container == "mp4" {
        cmd.args(["-movflags", "+faststart"]);
    }
    cmd.arg(target.to_string_lossy());
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn software_mode_uses_only_software_candidates() {
        let table = CandidateTable::builtin();
        let names: Vec<_> = table
            .candidates(AccelerationMode::Software)
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["h264-x264", "vp9-libvpx", "av1-svt"]);
    }

    #[test]
    fn hardware_mode_falls_through_to_software() {
        let table = CandidateTable::builtin();
        let modes: Vec<_> = table
            .candidates(AccelerationMode::Hardware)
            .map(|c| c.acceleration)
            .collect();
        assert_eq!(modes.len(), HARDWARE_CANDIDATES.len() + SOFTWARE_CANDIDATES.len());
        let first_software = modes
            .iter()
            .position(|m| *m == AccelerationMode::Software)
            .unwrap();
        assert!(modes[..first_software]
            .iter()
            .all(|m| *m == AccelerationMode::Hardware));
        assert!(modes[first_software..]
            .iter()
            .all(|m| *m == AccelerationMode::Software));
    }

    #[test]
    fn candidate_names_are_unique() {
        let table = CandidateTable::builtin();
        let names: HashSet<_> = table
            .candidates(AccelerationMode::Hardware)
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), table.len(AccelerationMode::Hardware));
    }

    #[test]
    fn mode_from_preference() {
        assert_eq!(AccelerationMode::from_preference(true), AccelerationMode::Hardware);
        assert_eq!(AccelerationMode::from_preference(false), AccelerationMode::Software);
        assert_eq!(AccelerationMode::Hardware.to_string(), "hardware");
    }

    #[test]
    fn transcode_command_shape() {
        let candidate = &SOFTWARE_CANDIDATES[0];
        let cmd = transcode_command(
            Path::new("/usr/bin/ffmpeg"),
            candidate,
            Path::new("/videos/in.mov"),
            Path::new("/derived/abc/720p.mp4"),
            720,
            Duration::from_secs(60),
        );
        let args = cmd.get_args();

        assert!(cmd.has_flag_value("-i", "/videos/in.mov"));
        assert!(cmd.has_flag_value("-c:v", "libx264"));
        assert!(cmd.has_flag_value("-crf", "23"));
        assert!(cmd.has_flag_value("-vf", "scale=-2:720"));
        assert!(cmd.has_flag_value("-c:a", "aac"));
        assert!(cmd.has_flag_value("-b:a", "128k"));
        assert!(cmd.has_flag_value("-movflags", "+faststart"));
        assert_eq!(args.last().unwrap(), "/derived/abc/720p.mp4");
        assert_eq!(cmd.get_timeout(), Duration::from_secs(60));

        // Encoder args come before the scale filter.
        let cv = args.iter().position(|a| a == "-c:v").unwrap();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        let crf = args.iter().position(|a| a == "-crf").unwrap();
        assert!(cv < crf && crf < vf);
    }
}
