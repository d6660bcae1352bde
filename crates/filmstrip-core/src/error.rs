use std::path::PathBuf;

use image::ImageError;
use thiserror::Error;

/// Errors produced by the frame pipeline.
///
/// `SourceOpen`, `NoFramesCaptured` and `InvalidConfig` end a run. `FrameDecode` and
/// `FrameWrite` are per-frame: the extractor logs them and moves on. `EmptySequence` and
/// `Compose` come from the composer and never leave a partial output file behind.
#[derive(Debug, Error)]
pub enum FilmstripError {
    /// The video could not be opened or probed.
    #[error("failed to open video source {}: {reason}", .path.display())]
    SourceOpen { path: PathBuf, reason: String },

    /// A single frame could not be read from its source.
    #[error("failed to decode frame {index}: {reason}")]
    FrameDecode { index: usize, reason: String },

    /// A single normalized frame could not be persisted.
    #[error("failed to write frame {index} to {}: {source}", .path.display())]
    FrameWrite {
        index: usize,
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    /// Extraction finished without producing a single frame.
    #[error("no frames captured")]
    NoFramesCaptured,

    /// The composer was handed zero frames.
    #[error("cannot compose an empty frame sequence")]
    EmptySequence,

    /// Concatenation, resizing or encoding of the filmstrip failed.
    #[error("failed to compose filmstrip: {0}")]
    Compose(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = FilmstripError> = std::result::Result<T, E>;
