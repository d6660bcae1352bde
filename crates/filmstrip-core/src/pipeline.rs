use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::composer::{ComposeConfig, FilmstripComposer};
use crate::error::{FilmstripError, Result};
use crate::extractor::{ExtractConfig, FrameExtractor};
use crate::progress::ProgressReporter;
use crate::video::{FrameSequence, SourceFrame, VideoInfo};

/// Where the frames to normalize come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameSourceKind {
    /// `*.jpeg` files already decoded into the frames directory, in filename order.
    #[default]
    Directory,
    /// Frames decoded from the video itself, in stream order.
    Decode,
}

/// Parameters for a full extract-and-compose run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub video: PathBuf,
    /// Directory the normalized frames are written to (and read from, for
    /// [`FrameSourceKind::Directory`]).
    pub frames_dir: PathBuf,
    /// Filmstrip path. Its extension is replaced by the resolved output format.
    pub output_path: PathBuf,
    pub source: FrameSourceKind,
    pub extract: ExtractConfig,
    pub compose: ComposeConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video: PathBuf::new(),
            frames_dir: PathBuf::from("frames_output"),
            output_path: PathBuf::from("compiled_img.jpeg"),
            source: FrameSourceKind::Directory,
            extract: ExtractConfig::default(),
            compose: ComposeConfig::default(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct PipelineReport {
    pub video: VideoInfo,
    pub frames_written: usize,
    /// Filmstrip path, or `None` when composing failed.
    pub compiled: Option<PathBuf>,
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Video length as `"{m}m {s}s"`, when it is known.
    pub fn formatted_duration(&self) -> Option<String> {
        self.video.duration_seconds().map(format_minutes_seconds)
    }
}

pub fn format_minutes_seconds(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as u64;
    let rest = (seconds % 60.0) as u64;
    format!("{minutes}m {rest}s")
}

/// Normalize every frame, then compose them into one filmstrip.
///
/// Fails when the video cannot be opened or no frame survives extraction. A failed
/// composition is only logged: the normalized frames are already on disk, so the report
/// is still returned with `compiled` set to `None`.
pub fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<PipelineReport> {
    let started = Instant::now();
    config.extract.validate()?;
    config.compose.validate()?;

    info!(
        video = ?config.video,
        frames_dir = ?config.frames_dir,
        output = ?config.output_path,
        source = ?config.source,
        target_width = config.extract.target_width,
        "pipeline starting"
    );

    fs::create_dir_all(&config.frames_dir)?;

    let extractor = FrameExtractor::new(config.extract.clone(), progress);
    let (video, frames) = match config.source {
        FrameSourceKind::Directory => {
            extractor.extract_from_directory(&config.video, &config.frames_dir)?
        }
        FrameSourceKind::Decode => {
            extractor.extract_from_video(&config.video, &config.frames_dir)?
        }
    };
    compose_report(config, video, frames, started)
}

/// Run the pipeline over an already opened frame source described by `video`.
pub fn run_with_frames<I>(
    config: &PipelineConfig,
    video: VideoInfo,
    frames: I,
    progress: &dyn ProgressReporter,
) -> Result<PipelineReport>
where
    I: IntoIterator<Item = Result<SourceFrame>>,
{
    let started = Instant::now();
    config.compose.validate()?;
    let extractor = FrameExtractor::new(config.extract.clone(), progress);
    let frames = extractor.extract(&video, frames, &config.frames_dir)?;
    compose_report(config, video, frames, started)
}

fn compose_report(
    config: &PipelineConfig,
    video: VideoInfo,
    frames: FrameSequence,
    started: Instant,
) -> Result<PipelineReport> {
    let Some(first) = frames.first() else {
        error!(frames_dir = ?config.frames_dir, "no frames captured");
        return Err(FilmstripError::NoFramesCaptured);
    };
    let original_width = first.width();

    let composer = FilmstripComposer::new(config.compose.clone());
    let compiled = match composer.compose(&frames, &config.output_path, original_width) {
        Ok(out) => Some(out.path),
        Err(e) => {
            warn!(error = %e, "continuing without a filmstrip");
            None
        }
    };

    let report = PipelineReport {
        video,
        frames_written: frames.len(),
        compiled,
        elapsed: started.elapsed(),
    };
    info!(
        frames = report.frames_written,
        compiled = ?report.compiled,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "pipeline complete"
    );
    Ok(report)
}

/// First file in `dir`, by name, whose extension is one of `extensions`.
///
/// Extensions may be given with or without the leading dot and match case-insensitively.
pub fn find_video(dir: &Path, extensions: &[String]) -> Result<Option<PathBuf>> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| wanted.contains(&e.to_ascii_lowercase()));
        if matches && entry.file_type()?.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}
