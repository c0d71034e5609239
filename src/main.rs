//! Reelcast - video timeline editing on top of ffmpeg
//!
//! Command-line host for the library: each subcommand runs one clip
//! operation or a full timeline render through the shared engine.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use reelcast::cli::{Args, Commands};
use reelcast::clip::{Clip, MediaBlob, MediaKind};
use reelcast::config::Config;
use reelcast::engine::{EngineBinding, FfmpegEngine, tracing_log_sink};
use reelcast::library::{self, hydrate, hydrate_all, kind_for_path, local_clip};
use reelcast::logging::setup_logging;
use reelcast::media::{ClipExecutor, MediaCommandBuilder, TimelineCompositor, VideoFilter};
use reelcast::store::edited_clip_name;
use reelcast::timeline::RenderSettings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("reelcast.toml").exists() {
                Config::from_file("reelcast.toml")?
            } else {
                Config::default()
            }
        }
    };

    let _log_guard = setup_logging(&config.logging, args.verbose)?;
    info!("Starting Reelcast");

    // Scanning never needs the engine
    if let Commands::Scan { dir, kind } = &args.command {
        let files = library::scan_directory(dir, *kind)?;
        if files.is_empty() {
            println!("No {} files found in {}", kind.as_str(), dir.display());
        }
        for file in files {
            println!("{:<12} {}", library::mime_type_for_path(&file), file.display());
        }
        return Ok(());
    }

    let commands = MediaCommandBuilder::new(config.engine.preset.clone());
    let binding = Arc::new(EngineBinding::new(Arc::new(FfmpegEngine::new(config.engine.clone()))));
    binding.ensure_ready(tracing_log_sink()).await?;

    let executor = ClipExecutor::new(binding.clone(), commands.clone());

    match args.command {
        Commands::Render {
            inputs,
            resolution,
            quality,
            output,
        } => {
            info!("Rendering {} clips to {}", inputs.len(), output.display());
            let clips: Vec<Clip> = inputs.iter().map(|path| open_clip(path)).collect();
            let clips = hydrate_all(&clips).await?;

            let compositor = TimelineCompositor::new(binding.clone(), commands);
            let settings = RenderSettings::new(resolution, quality);
            let bar = progress_bar("render")?;
            let on_progress = {
                let bar = bar.clone();
                move |percent: u8| bar.set_position(percent as u64)
            };
            let blob = compositor.render(&clips, settings, &on_progress).await?;
            bar.finish_and_clear();
            write_blob(&output, &blob).await?;
        }
        Commands::Trim {
            input,
            start,
            end,
            output,
        } => {
            info!("Trimming {} ({}s - {}s)", input.display(), start, end);
            let clip = hydrate(&open_clip(&input)).await?;
            let measured = executor.measure(&clip).await?;

            let bar = progress_bar("trim")?;
            let on_progress = {
                let bar = bar.clone();
                move |percent: u8| bar.set_position(percent as u64)
            };
            let blob = executor.trim(&measured, start, end, &on_progress).await?;
            bar.finish_and_clear();
            write_blob(&output, &blob).await?;
        }
        Commands::Filter {
            input,
            name,
            value,
            output,
        } => {
            let filter = VideoFilter::parse(&name, value)?;
            info!("Applying {} to {}", filter, input.display());
            let clip = hydrate(&open_clip(&input)).await?;

            let bar = progress_bar(filter.name())?;
            let on_progress = {
                let bar = bar.clone();
                move |percent: u8| bar.set_position(percent as u64)
            };
            let blob = executor.apply_filter(&clip, filter, &on_progress).await?;
            bar.finish_and_clear();
            write_blob(&output, &blob).await?;
        }
        Commands::Export { input, height, output } => {
            info!("Exporting {} at {}", input.display(), height);
            let clip = hydrate(&open_clip(&input)).await?;

            let bar = progress_bar("export")?;
            let on_progress = {
                let bar = bar.clone();
                move |percent: u8| bar.set_position(percent as u64)
            };
            let blob = executor.export_resolution(&clip, height, &on_progress).await?;
            bar.finish_and_clear();
            write_blob(&output, &blob).await?;
        }
        Commands::Split { input, at, output_dir } => {
            info!("Splitting {} at {}s", input.display(), at);
            let clip = hydrate(&open_clip(&input)).await?;
            let measured = executor.measure(&clip).await?;

            let bar = progress_bar("split")?;
            let on_progress = {
                let bar = bar.clone();
                move |percent: u8| bar.set_position(percent as u64)
            };
            let (head, tail) = executor.split(&measured, at, &on_progress).await?;
            bar.finish_and_clear();

            let dir = output_dir
                .or_else(|| input.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."));
            write_blob(&dir.join(edited_clip_name(&clip.name, "split-1")), &head).await?;
            write_blob(&dir.join(edited_clip_name(&clip.name, "split-2")), &tail).await?;
        }
        Commands::Probe { input } => {
            let clip = hydrate(&open_clip(&input)).await?;
            let measured = executor.measure(&clip).await?;
            println!("{}: {:.3}s", clip.name, measured.duration);
        }
        Commands::Scan { .. } => {}
    }

    info!("Reelcast completed successfully");
    Ok(())
}

/// Deferred clip for a path given on the command line.
fn open_clip(path: &Path) -> Clip {
    local_clip(path, kind_for_path(path).unwrap_or(MediaKind::Video))
}

fn progress_bar(label: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:8} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}%")?
            .progress_chars("#>-"),
    );
    bar.set_message(label.to_string());
    Ok(bar)
}

async fn write_blob(path: &Path, blob: &MediaBlob) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &blob.data).await?;
    println!("Wrote {} ({} bytes)", path.display(), blob.len());
    Ok(())
}
