use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipforge")]
#[command(author, version, about = "Video clip processing with sticky encoder selection")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcode a video to a rendition of the given height
    Transcode {
        /// Source video
        #[arg(required = true)]
        input: PathBuf,

        /// Output file
        #[arg(required = true)]
        output: PathBuf,

        /// Output height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Prefer hardware encoders (overrides config)
        #[arg(long, conflicts_with = "software")]
        hardware: bool,

        /// Use software encoders only (overrides config)
        #[arg(long)]
        software: bool,

        /// Per-attempt timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a poster frame
    Poster {
        /// Source video
        #[arg(required = true)]
        input: PathBuf,

        /// Output image
        #[arg(required = true)]
        output: PathBuf,

        /// Seek offset in seconds
        #[arg(long)]
        offset: Option<f64>,

        /// Overwrite an existing output
        #[arg(long)]
        regenerate: bool,
    },

    /// Create a boomerang preview clip
    Preview {
        /// Source video
        #[arg(required = true)]
        input: PathBuf,

        /// Output clip
        #[arg(required = true)]
        output: PathBuf,

        /// Seconds of source to use
        #[arg(long)]
        duration: Option<f64>,

        /// Overwrite an existing output
        #[arg(long)]
        regenerate: bool,
    },

    /// Scan the video directory and derive artifacts for every video
    Scan {
        /// Video directory (overrides config)
        #[arg(long)]
        video_dir: Option<PathBuf>,

        /// Derived-artifact directory (overrides config)
        #[arg(long)]
        derived_dir: Option<PathBuf>,

        /// Videos processed at once (overrides config)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive artifacts for a single video
    ScanVideo {
        /// Video to process
        #[arg(required = true)]
        input: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List encoder candidates and whether ffmpeg advertises them
    Encoders {
        /// Skip querying ffmpeg
        #[arg(long)]
        no_probe: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
