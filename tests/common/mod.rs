//! Shared test harness for integration tests.
//!
//! Provides [`FakeRunner`], a scripted [`ProcessRunner`] that never spawns a
//! process, and [`TestHarness`], which wires a full [`AppContext`] around it
//! inside a temporary directory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use clipforge::AppContext;
use clipforge_av::{ProcessRunner, ToolCommand, ToolOutput, ToolRegistry};
use clipforge_common::config::Config;
use clipforge_common::{Error, Result};

pub const SOFTWARE_CODECS: [&str; 3] = ["libx264", "libvpx-vp9", "libsvtav1"];
pub const HARDWARE_CODECS: [&str; 3] = ["av1_nvenc", "h264_nvenc", "h264_qsv"];

const ENCODER_LISTING: &str = "Encoders:\n V....D libx264  libx264 H.264\n V....D libvpx-vp9  libvpx VP9\n V....D libsvtav1  SVT-AV1\n";

const PROBE_JSON: &str = r#"{
    "streams": [
        {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
         "r_frame_rate": "30/1", "duration": "10.0"},
        {"codec_type": "audio", "codec_name": "aac"}
    ],
    "format": {"duration": "10.0"}
}"#;

/// How the fake answers an encode for a given `-c:v` value.
#[derive(Clone)]
pub enum Behavior {
    /// Exit 0 and write the output file.
    Succeed,
    /// Exit 0 without writing anything.
    SucceedEmpty,
    /// Write a partial file, then exit with the given code.
    Fail(i32),
    /// Write a partial file, then report a timeout.
    Timeout,
    /// Refuse to start, as if ffmpeg were missing.
    Unavailable,
    /// Signal `entered`, wait for `release`, then succeed.
    Hold(Arc<Gate>),
}

#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// One recorded encode or artifact invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub video_codec: Option<String>,
    pub output: PathBuf,
    /// Whether a file was already at the output path when the call started.
    pub output_existed: bool,
    pub args: Vec<String>,
}

/// Scripted process runner keyed by video codec.
pub struct FakeRunner {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<Vec<Invocation>>,
    listings: AtomicUsize,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Mutex<Duration>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    /// Script `codec`. Artifact calls without `-c:v` use the key `""`.
    pub fn set(&self, codec: &str, behavior: Behavior) {
        self.behaviors.lock().insert(codec.to_string(), behavior);
    }

    pub fn fail(&self, codecs: &[&str]) {
        for codec in codecs {
            self.set(codec, Behavior::Fail(1));
        }
    }

    pub fn succeed(&self, codecs: &[&str]) {
        for codec in codecs {
            self.set(codec, Behavior::Succeed);
        }
    }

    /// Sleep this long inside every encode.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// `-c:v` values of every encode, in call order.
    pub fn encodes(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.video_codec.clone())
            .collect()
    }

    pub fn encode_count(&self, codec: &str) -> usize {
        self.encodes().iter().filter(|c| *c == codec).count()
    }

    /// Number of ffmpeg invocations (encodes and artifacts, not listings).
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn listing_calls(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Highest number of ffmpeg invocations observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
        self.listings.store(0, Ordering::SeqCst);
        self.probes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let args = command.get_args().to_vec();

        if command.program_name() == "ffprobe" {
            self.probes.fetch_add(1, Ordering::SeqCst);
            return Ok(ToolOutput {
                exit_code: Some(0),
                stdout: PROBE_JSON.into(),
                ..Default::default()
            });
        }
        if args.iter().any(|a| a == "-encoders") {
            self.listings.fetch_add(1, Ordering::SeqCst);
            return Ok(ToolOutput {
                exit_code: Some(0),
                stdout: ENCODER_LISTING.into(),
                ..Default::default()
            });
        }

        let video_codec = args
            .iter()
            .position(|a| a == "-c:v")
            .and_then(|i| args.get(i + 1))
            .cloned();
        let output = PathBuf::from(args.last().cloned().unwrap_or_default());
        let behavior = self
            .behaviors
            .lock()
            .get(video_codec.as_deref().unwrap_or(""))
            .cloned()
            .unwrap_or(Behavior::Succeed);

        self.calls.lock().push(Invocation {
            program: command.program_name(),
            video_codec,
            output_existed: output.exists(),
            output: output.clone(),
            args,
        });

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        match behavior {
            Behavior::Succeed => {
                write(&output, b"encoded");
                Ok(exited(0))
            }
            Behavior::SucceedEmpty => Ok(exited(0)),
            Behavior::Fail(code) => {
                write(&output, b"partial");
                Ok(ToolOutput {
                    stderr: "Unknown encoder\nConversion failed!\n".into(),
                    ..exited(code)
                })
            }
            Behavior::Timeout => {
                write(&output, b"partial");
                Ok(ToolOutput {
                    exit_code: None,
                    timed_out: true,
                    ..Default::default()
                })
            }
            Behavior::Unavailable => Err(Error::tool_not_found("ffmpeg")),
            Behavior::Hold(gate) => {
                gate.entered.notify_one();
                gate.release.notified().await;
                write(&output, b"encoded");
                Ok(exited(0))
            }
        }
    }
}

fn exited(code: i32) -> ToolOutput {
    ToolOutput {
        exit_code: Some(code),
        ..Default::default()
    }
}

fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// A full [`AppContext`] over a [`FakeRunner`] in a temporary directory.
pub struct TestHarness {
    pub dir: tempfile::TempDir,
    pub runner: Arc<FakeRunner>,
    pub ctx: Arc<AppContext>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.scan.video_dir = dir.path().join("videos");
        config.scan.derived_dir = dir.path().join("derived");
        config.transcode.timeout_secs = 30;
        customize(&mut config);
        std::fs::create_dir_all(&config.scan.video_dir).unwrap();

        let runner = FakeRunner::new();
        let ctx = Arc::new(AppContext::with_runner(
            config,
            ToolRegistry::default(),
            runner.clone(),
        ));
        Self { dir, runner, ctx }
    }

    /// Write a fake source video into the video directory.
    pub fn source(&self, name: &str) -> PathBuf {
        let path = self.ctx.config.scan.video_dir.join(name);
        write(&path, format!("fake video {name}").as_bytes());
        path
    }

    /// A path under the temporary output directory.
    pub fn target(&self, name: &str) -> PathBuf {
        self.dir.path().join("out").join(name)
    }
}
