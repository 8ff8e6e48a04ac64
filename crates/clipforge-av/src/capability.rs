//! Encoder capability probing.
//!
//! Asks ffmpeg which encoders it was built with and remembers the answer per
//! encoder identifier for the lifetime of the prober. A failed query counts
//! as "unavailable" and is cached as well.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::command::ToolCommand;
use crate::runner::ProcessRunner;

/// Default bound for the `-encoders` listing.
pub const DEFAULT_CAPABILITY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CapabilityProber {
    runner: Arc<dyn ProcessRunner>,
    ffmpeg: PathBuf,
    timeout: Duration,
    cache: Mutex<HashMap<String, bool>>,
    /// Serializes queries so concurrent misses for one identifier run ffmpeg once.
    query: AsyncMutex<()>,
}

impl CapabilityProber {
    pub fn new(runner: Arc<dyn ProcessRunner>, ffmpeg: PathBuf) -> Self {
        Self {
            runner,
            ffmpeg,
            timeout: DEFAULT_CAPABILITY_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
            query: AsyncMutex::new(()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether ffmpeg advertises `encoder`.
    pub async fn is_available(&self, encoder: &str) -> bool {
        if let Some(known) = self.cached(encoder) {
            return known;
        }

        let _guard = self.query.lock().await;
        if let Some(known) = self.cached(encoder) {
            return known;
        }

        let available = self.query_encoder(encoder).await;
        self.cache.lock().insert(encoder.to_string(), available);
        available
    }

    /// Cached answer for `encoder`, if it has been queried.
    pub fn cached(&self, encoder: &str) -> Option<bool> {
        self.cache.lock().get(encoder).copied()
    }

    /// Forget every cached answer.
    pub fn clear(&self) {
        self.cache.lock().clear();
        tracing::debug!("Cleared capability cache");
    }

    async fn query_encoder(&self, encoder: &str) -> bool {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(["-hide_banner", "-encoders"]);
        cmd.timeout(self.timeout);

        match self.runner.run(&cmd).await {
            Ok(out) if out.success() => {
                let found = out.stdout.contains(encoder) || out.stderr.contains(encoder);
                tracing::debug!(encoder, available = found, "Queried encoder capability");
                found
            }
            Ok(out) if out.timed_out => {
                tracing::warn!(
                    encoder,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Encoder listing timed out; treating encoder as unavailable"
                );
                false
            }
            Ok(out) => {
                tracing::warn!(
                    encoder,
                    exit_code = ?out.exit_code,
                    "Encoder listing failed; treating encoder as unavailable"
                );
                false
            }
            Err(e) => {
                tracing::warn!(encoder, "Could not run encoder listing: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for CapabilityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProber")
            .field("ffmpeg", &self.ffmpeg)
            .field("timeout", &self.timeout)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}
