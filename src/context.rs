//! Application wiring.
//!
//! One [`AppContext`] per process holds the shared runner, encoder cache and
//! capability cache, so every job in a sweep sees the same pinned encoders.

use std::sync::Arc;

use clipforge_av::{
    ArtifactGenerator, CapabilityProber, EncoderCache, FfprobeProber, MediaProber,
    ProcessRunner, Selector, SystemRunner, ToolRegistry, Transcoder,
};
use clipforge_common::config::Config;

pub struct AppContext {
    pub config: Config,
    pub tools: ToolRegistry,
    pub transcoder: Transcoder,
    pub artifacts: ArtifactGenerator,
    pub prober: Arc<dyn MediaProber>,
}

impl AppContext {
    /// Discover tools and wire the real process runner.
    pub fn new(config: Config) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        Self::with_runner(config, tools, Arc::new(SystemRunner))
    }

    /// Wire every component around `runner`.
    pub fn with_runner(
        config: Config,
        tools: ToolRegistry,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let ffmpeg = tools.ffmpeg();

        let capabilities = Arc::new(
            CapabilityProber::new(runner.clone(), ffmpeg.clone())
                .with_timeout(config.transcode.capability_timeout()),
        );
        let selector = Selector::new(
            runner.clone(),
            capabilities,
            Arc::new(EncoderCache::new()),
            ffmpeg.clone(),
        )
        .with_baseline_hardware_encoder(config.transcode.baseline_hardware_encoder.clone());
        let transcoder = Transcoder::new(selector, config.transcode.timeout());

        let artifacts = ArtifactGenerator::new(runner.clone(), ffmpeg, &config.artifacts);
        let prober: Arc<dyn MediaProber> = Arc::new(FfprobeProber::new(runner, tools.ffprobe()));

        Self {
            config,
            tools,
            transcoder,
            artifacts,
            prober,
        }
    }
}
