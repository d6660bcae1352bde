mod cli;
mod progress;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use filmstrip_core::pipeline::{self, find_video, FrameSourceKind, PipelineConfig};
use filmstrip_core::{ComposeConfig, ExtractConfig, FilmstripError};

use crate::progress::BarProgress;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let cwd = std::env::current_dir().context("failed to read current directory")?;

    let video = match cli.input_video {
        Some(path) => path,
        None => match find_video(&cwd, &cli.video_extensions)
            .context("failed to search for a video")?
        {
            Some(path) => path,
            None => {
                error!(
                    dir = ?cwd,
                    extensions = ?cli.video_extensions,
                    "no video file found in the current directory"
                );
                return Ok(());
            }
        },
    };

    let config = PipelineConfig {
        video: absolute(&cwd, &video),
        frames_dir: absolute(&cwd, &cli.output_folder),
        output_path: absolute(&cwd, &cli.output_image_path),
        source: if cli.decode {
            FrameSourceKind::Decode
        } else {
            FrameSourceKind::Directory
        },
        extract: ExtractConfig {
            target_width: cli.output_width,
            ..ExtractConfig::default()
        },
        compose: ComposeConfig {
            format: cli.output_format,
            quality: cli.image_quality,
            ..ComposeConfig::default()
        },
    };

    let progress = BarProgress::new();
    let report = match pipeline::run_pipeline(&config, &progress) {
        Ok(report) => report,
        Err(FilmstripError::NoFramesCaptured) => {
            error!("no frames captured");
            return Ok(());
        }
        Err(e) => return Err(e).context("pipeline failed"),
    };

    info!(codec = %report.video.codec_tag, "video codec");
    info!(
        total_secs = %format!("{:.2}", report.elapsed.as_secs_f64()),
        duration_secs = ?report.video.duration_seconds(),
        duration = ?report.formatted_duration(),
        frames = report.frames_written,
        compiled = ?report.compiled,
        "processing complete"
    );

    Ok(())
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
