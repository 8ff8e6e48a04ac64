//! Content-derived video identifiers.
//!
//! A [`VideoId`] is computed from the leading bytes of the file rather than
//! its path, so moving or renaming a clip keeps its derived artifacts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

const MIB: u64 = 1024 * 1024;

/// Number of hex characters in a rendered [`VideoId`] (128 bits).
pub const VIDEO_ID_LEN: usize = 32;

/// Stable identifier for a source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Hash the first `window_mb` MiB of `path` (the whole file when smaller).
    pub fn from_file(path: &Path, window_mb: u64) -> Result<Self> {
        let file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut reader = file.take(window_mb.saturating_mul(MIB));
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self::from_digest(&hasher.finalize()))
    }

    /// Build an identifier directly from in-memory content.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_digest(&Sha256::digest(bytes))
    }

    fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(&digest[..VIDEO_ID_LEN / 2]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn id_is_32_lowercase_hex() {
        let id = VideoId::from_bytes(b"clip");
        assert_eq!(id.as_str().len(), VIDEO_ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn file_and_bytes_agree_for_small_files() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not really a video").unwrap();
        let from_file = VideoId::from_file(f.path(), 16).unwrap();
        assert_eq!(from_file, VideoId::from_bytes(b"not really a video"));
    }

    #[test]
    fn only_the_window_is_hashed() {
        let head = vec![7u8; MIB as usize];
        let mut a = tempfile::NamedTempFile::new().unwrap();
        a.write_all(&head).unwrap();
        a.write_all(b"tail one").unwrap();
        let mut b = tempfile::NamedTempFile::new().unwrap();
        b.write_all(&head).unwrap();
        b.write_all(b"different tail").unwrap();

        let id_a = VideoId::from_file(a.path(), 1).unwrap();
        let id_b = VideoId::from_file(b.path(), 1).unwrap();
        assert_eq!(id_a, id_b);
        assert_ne!(
            VideoId::from_file(a.path(), 2).unwrap(),
            VideoId::from_file(b.path(), 2).unwrap()
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = VideoId::from_file(Path::new("/nonexistent/clip.mp4"), 16).unwrap_err();
        assert!(matches!(err, crate::Error::Io { .. }));
    }
}
