use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageError, RgbImage};
use tracing::{debug, error, info};

use crate::error::{FilmstripError, Result};
use crate::geometry::{aspect_ratio, scaled_height};
use crate::progress::ProgressReporter;
use crate::storage::write_staged;
use crate::video::frame::{to_rgb, Frame, FrameSequence, SourceFrame};
use crate::video::{DirectoryFrames, VideoDecoder, VideoInfo};

/// Interpolation used for every resize in the pipeline.
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Parameters for per-frame normalization.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Width every frame is resized to.
    pub target_width: u32,
    /// JPEG quality (0-100) of the persisted frames.
    pub jpeg_quality: u8,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            target_width: 1080,
            jpeg_quality: 95,
        }
    }
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(FilmstripError::InvalidConfig(
                "target width must be > 0".into(),
            ));
        }
        if self.jpeg_quality > 100 {
            return Err(FilmstripError::InvalidConfig(format!(
                "jpeg quality must be 0-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// File name of the normalized frame at `index`.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:04}.jpeg")
}

/// Normalizes frames to a common size, converts them to RGB and persists each one.
pub struct FrameExtractor<'a> {
    config: ExtractConfig,
    progress: &'a dyn ProgressReporter,
}

impl<'a> FrameExtractor<'a> {
    pub fn new(config: ExtractConfig, progress: &'a dyn ProgressReporter) -> Self {
        Self { config, progress }
    }

    /// Normalize the `*.jpeg` frames already present in `dir`, overwriting them in place
    /// as `frame_NNNN.jpeg`. Returns the probed video alongside the frames.
    pub fn extract_from_directory(
        &self,
        video: &Path,
        dir: &Path,
    ) -> Result<(VideoInfo, FrameSequence)> {
        let info = VideoInfo::probe(video)?;
        let files = DirectoryFrames::scan(dir)?;
        let frames = self.extract(&info, files, dir)?;
        Ok((info, frames))
    }

    /// Decode `video` directly and normalize every frame into `output_dir`.
    ///
    /// The decoder is released when this returns, on success and on error.
    pub fn extract_from_video(
        &self,
        video: &Path,
        output_dir: &Path,
    ) -> Result<(VideoInfo, FrameSequence)> {
        let mut decoder = VideoDecoder::open(video)?;
        let info = decoder.info().clone();
        let frames = self.extract(&info, &mut decoder, output_dir)?;
        Ok((info, frames))
    }

    /// Normalize `frames` in order and write them to `output_dir`.
    ///
    /// Every frame is resized to `target_width` and the height implied by the native
    /// aspect ratio in `info`, so all frames come out the same size. At most
    /// `info.frame_count` frames are taken when the count is known. Frames that fail to
    /// decode or to persist are logged with their index and left out of the result.
    pub fn extract<I>(&self, info: &VideoInfo, frames: I, output_dir: &Path) -> Result<FrameSequence>
    where
        I: IntoIterator<Item = Result<SourceFrame>>,
    {
        self.config.validate()?;
        if info.width == 0 || info.height == 0 {
            return Err(FilmstripError::InvalidConfig(format!(
                "video dimensions must be non-zero, got {}x{}",
                info.width, info.height
            )));
        }

        let aspect = aspect_ratio(info.width, info.height);
        let width = self.config.target_width;
        let height = scaled_height(width, aspect);
        let limit = info
            .frame_count
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        info!(
            native_width = info.width,
            native_height = info.height,
            aspect,
            width,
            height,
            ?output_dir,
            "normalizing frames"
        );
        self.progress.start(info.frame_count);

        let mut sequence = FrameSequence::new();

        for (index, source) in frames.into_iter().take(limit).enumerate() {
            let source = match source {
                Ok(source) => source,
                Err(e) => {
                    error!(frame_index = index, error = %e, "failed to decode frame, skipping");
                    continue;
                }
            };

            let image = normalize(&source, width, height);
            let path = output_dir.join(frame_file_name(index));

            if let Err(source) = write_jpeg(&image, &path, self.config.jpeg_quality) {
                let e = FilmstripError::FrameWrite {
                    index,
                    path,
                    source,
                };
                error!(frame_index = index, error = %e, "failed to write frame, skipping");
                continue;
            }

            debug!(frame_index = index, ?path, "frame written");
            sequence.push(Frame { index, image });
            self.progress.advance(sequence.len());
        }

        self.progress.finish(sequence.len());
        info!(frames = sequence.len(), "frame normalization complete");
        Ok(sequence)
    }
}

/// Resize a source frame to `width`x`height` and bring it into RGB order.
fn normalize(source: &SourceFrame, width: u32, height: u32) -> RgbImage {
    let resized = imageops::resize(&source.image, width, height, RESIZE_FILTER);
    to_rgb(resized, source.order)
}

/// Encode in memory, then stage and rename, so an existing frame file is only ever
/// replaced by a complete one.
fn write_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), ImageError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(image)?;
    write_staged(path, buf.get_ref()).map_err(ImageError::IoError)
}
