//! Media probing.
//!
//! Only the facts the scan needs are extracted: duration, frame size,
//! codecs and frame rate. Anything richer belongs to a dedicated prober.

pub mod ffprobe;

use std::path::Path;

use async_trait::async_trait;
use clipforge_common::Result;
use serde::{Deserialize, Serialize};

pub use self::ffprobe::FfprobeProber;

/// Basic facts about a media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds, if the container or stream reports one.
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Frame rate rounded to the nearest integer.
    pub framerate: Option<u32>,
}

/// Extracts [`MediaInfo`] from a file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS[.fff]` into seconds.
///
/// A fractional part is honoured on the seconds component only.
pub fn parse_duration(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    let seconds = |p: &str| p.trim().parse::<f64>().ok().filter(|v| *v >= 0.0);
    let whole = |p: &str| p.trim().parse::<u32>().ok().map(f64::from);

    match parts.as_slice() {
        [s] => seconds(*s),
        [m, s] => Some(whole(*m)? * 60.0 + seconds(*s)?),
        [h, m, s] => Some(whole(*h)? * 3600.0 + whole(*m)? * 60.0 + seconds(*s)?),
        _ => None,
    }
}

/// Parse an ffprobe rational such as `30000/1001`, rounded to whole frames.
pub fn parse_frame_rate(s: &str) -> Option<u32> {
    let (num, den) = s.split_once('/').unwrap_or((s, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some((num / den).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_forms() {
        assert_eq!(parse_duration("42"), Some(42.0));
        assert_eq!(parse_duration("2:05"), Some(125.0));
        assert_eq!(parse_duration("01:02:03"), Some(3723.0));
        assert_eq!(parse_duration("00:00:10.500000000"), Some(10.5));
    }

    #[test]
    fn duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration("ab:cd"), None);
        assert_eq!(parse_duration("-5"), None);
    }

    #[test]
    fn frame_rate_rounding() {
        assert_eq!(parse_frame_rate("30000/1001"), Some(30));
        assert_eq!(parse_frame_rate("60/1"), Some(60));
        assert_eq!(parse_frame_rate("25"), Some(25));
        assert_eq!(parse_frame_rate("0/0"), None);
    }
}
