//! Normalizes video frames to a common width and joins them into one filmstrip image.

pub mod composer;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod pipeline;
pub mod progress;
mod storage;
pub mod video;

pub use composer::{CompiledImage, ComposeConfig, FilmstripComposer, OutputFormat, CANVAS_WIDTH};
pub use error::{FilmstripError, Result};
pub use extractor::{ExtractConfig, FrameExtractor};
pub use pipeline::{run_pipeline, run_with_frames, FrameSourceKind, PipelineConfig, PipelineReport};
pub use progress::{LogProgress, NoProgress, ProgressReporter};
pub use video::{Frame, FrameSequence, SourceFrame, VideoInfo};
