mod cli;

use clipforge::{config, AppContext, Scanner};
use clipforge_av::{AccelerationMode, ArtifactStatus, TranscodeResult};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipforge=trace,clipforge_av=trace,clipforge_common=debug".to_string()
        } else {
            "clipforge=info,clipforge_av=info,clipforge_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Transcode {
            input,
            output,
            height,
            hardware,
            software,
            timeout,
            json,
        } => {
            let mut config = config::load_config_or_default(config_path)?;
            if hardware {
                config.transcode.use_hardware = true;
            }
            if software {
                config.transcode.use_hardware = false;
            }
            if let Some(secs) = timeout {
                config.transcode.timeout_secs = secs;
            }
            block_on(transcode(config, &input, &output, height, json))?
        }
        Commands::Poster {
            input,
            output,
            offset,
            regenerate,
        } => {
            let config = config::load_config_or_default(config_path)?;
            let offset = offset.unwrap_or(config.artifacts.poster_offset_secs);
            let regenerate = regenerate || config.artifacts.regenerate;
            let ctx = AppContext::new(config);
            let status = block_on(
                ctx.artifacts
                    .create_poster(&input, &output, offset, regenerate),
            )??;
            print_artifact("Poster", &output, status);
            Ok(())
        }
        Commands::Preview {
            input,
            output,
            duration,
            regenerate,
        } => {
            let config = config::load_config_or_default(config_path)?;
            let clip = duration.unwrap_or(config.artifacts.boomerang_clip_secs);
            let regenerate = regenerate || config.artifacts.regenerate;
            let ctx = AppContext::new(config);
            let status = block_on(
                ctx.artifacts
                    .create_boomerang_preview(&input, &output, clip, regenerate),
            )??;
            print_artifact("Preview", &output, status);
            Ok(())
        }
        Commands::Scan {
            video_dir,
            derived_dir,
            jobs,
            json,
        } => {
            let mut config = config::load_config_or_default(config_path)?;
            if let Some(dir) = video_dir {
                config.scan.video_dir = dir;
            }
            if let Some(dir) = derived_dir {
                config.scan.derived_dir = dir;
            }
            if let Some(jobs) = jobs {
                config.scan.max_concurrent_jobs = jobs;
            }
            block_on(scan(config, json))?
        }
        Commands::ScanVideo { input, json } => {
            let config = config::load_config_or_default(config_path)?;
            block_on(scan_video(config, &input, json))?
        }
        Commands::Probe { file, json } => {
            let config = config::load_config_or_default(config_path)?;
            block_on(probe_file(config, &file, json))?
        }
        Commands::Encoders { no_probe } => {
            let config = config::load_config_or_default(config_path)?;
            block_on(list_encoders(config, no_probe))?
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(config_path)?;
            block_on(check_tools(&config))?
        }
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("clipforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(future))
}

async fn transcode(
    config: config::Config,
    input: &Path,
    output: &Path,
    height: u32,
    json: bool,
) -> Result<()> {
    let use_hardware = config.transcode.use_hardware;
    let ctx = AppContext::new(config);
    let result = ctx
        .transcoder
        .transcode_to_height(input, output, height, use_hardware)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_transcode(&result, output);
    }

    if !result.success {
        anyhow::bail!(
            "All {} encoder candidates failed for {:?}",
            result.failures.len(),
            input
        );
    }
    Ok(())
}

fn print_transcode(result: &TranscodeResult, output: &Path) {
    for failure in &result.failures {
        println!("✗ {} ({}): {}", failure.candidate, failure.video_codec, failure.reason);
    }
    if let Some(encoder) = result.encoder {
        println!(
            "✓ {} ({}) -> {} in {:.1}s",
            encoder.name,
            encoder.video_codec,
            output.display(),
            result.elapsed.as_secs_f64()
        );
    }
}

fn print_artifact(kind: &str, output: &Path, status: ArtifactStatus) {
    match status {
        ArtifactStatus::Created => println!("{kind} created: {}", output.display()),
        ArtifactStatus::Skipped => println!(
            "{kind} already exists: {} (use --regenerate to rebuild)",
            output.display()
        ),
    }
}

async fn scan(config: config::Config, json: bool) -> Result<()> {
    if !config.scan.video_dir.is_dir() {
        anyhow::bail!("Video directory does not exist: {:?}", config.scan.video_dir);
    }
    let scanner = Scanner::new(Arc::new(AppContext::new(config)));
    let summary = scanner.scan().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for report in &summary.reports {
        let mark = if report.is_ok() { "✓" } else { "✗" };
        println!("{mark} {} {}", report.video_id, report.path.display());
    }
    for (path, error) in &summary.errors {
        println!("✗ {}: {error}", path.display());
    }
    for duplicate in &summary.duplicates {
        println!(
            "= {} {} (same as {})",
            duplicate.video_id,
            duplicate.path.display(),
            duplicate.original.display()
        );
    }
    println!();
    println!("Videos found:       {}", summary.videos_found);
    println!("Videos ok:          {}", summary.videos_ok);
    println!("Videos with errors: {}", summary.videos_failed);
    println!("Duplicates:         {}", summary.duplicates.len());
    println!("Posters created:    {}", summary.posters_created);
    println!("Previews created:   {}", summary.previews_created);
    println!("Renditions created: {}", summary.renditions_created);
    Ok(())
}

async fn scan_video(config: config::Config, input: &Path, json: bool) -> Result<()> {
    let scanner = Scanner::new(Arc::new(AppContext::new(config)));
    let report = scanner.scan_video(input).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Video:    {}", report.path.display());
        println!("Id:       {}", report.video_id);
        println!("Poster:   {:?}", report.poster);
        println!("Preview:  {:?}", report.preview);
        for rendition in &report.renditions {
            println!("{:>5}p:   {:?}", rendition.height, rendition.outcome);
        }
    }

    if !report.is_ok() {
        anyhow::bail!("Some artifacts could not be derived for {:?}", input);
    }
    Ok(())
}

async fn probe_file(config: config::Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let ctx = AppContext::new(config);
    let info = ctx.prober.probe(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    if let Some(duration) = info.duration_secs {
        let secs = duration as u64;
        println!(
            "Duration: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
    }
    if let (Some(w), Some(h)) = (info.width, info.height) {
        println!("Resolution: {w}x{h}");
    }
    if let Some(ref codec) = info.video_codec {
        print!("Video: {codec}");
        if let Some(fps) = info.framerate {
            print!(" @ {fps} fps");
        }
        println!();
    }
    if let Some(ref codec) = info.audio_codec {
        println!("Audio: {codec}");
    }
    Ok(())
}

async fn list_encoders(config: config::Config, no_probe: bool) -> Result<()> {
    let ctx = AppContext::new(config);
    let selector = ctx.transcoder.selector();

    for mode in AccelerationMode::ALL {
        println!("{mode}:");
        for (i, candidate) in selector.table().candidates(mode).enumerate() {
            let availability = if no_probe {
                ""
            } else if selector.prober().is_available(candidate.video_codec).await {
                "✓ "
            } else {
                "✗ "
            };
            println!(
                "  {}. {availability}{} ({} + {} {}, {})",
                i + 1,
                candidate.name,
                candidate.video_codec,
                candidate.audio_codec,
                candidate.audio_bitrate,
                candidate.container
            );
        }
    }
    Ok(())
}

async fn check_tools(config: &config::Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = clipforge_av::ToolRegistry::discover(&config.tools)
        .check_all()
        .await;
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable transcoding.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Video directory: {}", config.scan.video_dir.display());
    println!("  Derived directory: {}", config.scan.derived_dir.display());
    println!(
        "  Transcode: {} (heights {:?}, {})",
        if config.transcode.enabled { "enabled" } else { "disabled" },
        config.transcode.heights,
        AccelerationMode::from_preference(config.transcode.use_hardware)
    );
    println!("  Concurrent jobs: {}", config.scan.max_concurrent_jobs.max(1));

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("  Warnings:");
        for warning in warnings {
            println!("    - {warning}");
        }
    }

    Ok(())
}
