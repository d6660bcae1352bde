use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops;
use image::{ImageError, ImageFormat, RgbImage};
use tracing::{error, info, warn};

use crate::error::{FilmstripError, Result};
use crate::extractor::RESIZE_FILTER;
use crate::geometry::{canvas_height, dynamic_width, mean_aspect_ratio};
use crate::storage::write_staged;
use crate::video::frame::Frame;

/// Reference width the filmstrip height is derived from.
pub const CANVAS_WIDTH: u32 = 3840;

/// Image formats the filmstrip can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Jpg,
    Png,
    Tiff,
}

impl OutputFormat {
    /// Parse a format name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" => Some(Self::Jpeg),
            "jpg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Parse a format name, falling back to JPEG with a warning when it is not supported.
    pub fn resolve(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            warn!(requested = name, "unsupported output format, using jpeg instead");
            Self::Jpeg
        })
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
        }
    }

    /// Whether the encoder honours a quality factor.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::Jpg)
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg | Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parameters for the filmstrip.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub canvas_width: u32,
    /// Requested format name; unsupported names fall back to jpeg.
    pub format: String,
    /// Quality (0-100) for lossy formats. Ignored for png and tiff.
    pub quality: u8,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            format: "jpeg".into(),
            quality: 100,
        }
    }
}

impl ComposeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 {
            return Err(FilmstripError::InvalidConfig(
                "canvas width must be > 0".into(),
            ));
        }
        if self.quality > 100 {
            return Err(FilmstripError::InvalidConfig(format!(
                "image quality must be 0-100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Target dimensions of a filmstrip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripLayout {
    pub avg_aspect: f64,
    pub width: u32,
    pub height: u32,
}

/// The finished filmstrip and where it was written.
#[derive(Debug)]
pub struct CompiledImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// Concatenates frames left to right into one image and writes it out.
pub struct FilmstripComposer {
    config: ComposeConfig,
}

impl FilmstripComposer {
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }

    /// Compute the filmstrip size for `frames`.
    ///
    /// The height comes from the canvas width and the mean frame aspect ratio. The width
    /// scales `original_width` by the ratio of that height to the first frame's height.
    pub fn layout(&self, frames: &[Frame], original_width: u32) -> Result<StripLayout> {
        let first = frames.first().ok_or(FilmstripError::EmptySequence)?;
        if let Some(f) = frames.iter().find(|f| f.width() == 0 || f.height() == 0) {
            return Err(FilmstripError::Compose(format!(
                "frame {} is empty ({}x{})",
                f.index,
                f.width(),
                f.height()
            )));
        }
        let avg_aspect = mean_aspect_ratio(frames.iter().map(|f| (f.width(), f.height())))
            .ok_or(FilmstripError::EmptySequence)?;

        let height = canvas_height(self.config.canvas_width, avg_aspect);
        let width = dynamic_width(original_width, height, first.height());

        info!(avg_aspect, width, height, "filmstrip layout");
        Ok(StripLayout {
            avg_aspect,
            width,
            height,
        })
    }

    /// Concatenate and resize `frames` in memory without touching the filesystem.
    pub fn render(&self, frames: &[Frame], original_width: u32) -> Result<RgbImage> {
        self.config.validate()?;
        let layout = self.layout(frames, original_width)?;
        let strip = concat_horizontal(frames)?;
        Ok(imageops::resize(
            &strip,
            layout.width,
            layout.height,
            RESIZE_FILTER,
        ))
    }

    /// Render the filmstrip and write it next to `output_path`, with the extension
    /// replaced by the resolved format's.
    ///
    /// Nothing is written unless every step succeeds; failures are logged here and
    /// returned to the caller.
    pub fn compose(
        &self,
        frames: &[Frame],
        output_path: &Path,
        original_width: u32,
    ) -> Result<CompiledImage> {
        if frames.is_empty() {
            return Err(FilmstripError::EmptySequence);
        }

        let result = self.render_and_write(frames, output_path, original_width);
        if let Err(e) = &result {
            error!(error = %e, ?output_path, "failed to compose filmstrip");
        }
        result
    }

    fn render_and_write(
        &self,
        frames: &[Frame],
        output_path: &Path,
        original_width: u32,
    ) -> Result<CompiledImage> {
        let image = self.render(frames, original_width)?;

        let format = OutputFormat::resolve(&self.config.format);
        let path = output_path.with_extension(format.extension());

        let bytes = encode(&image, format, self.config.quality)
            .map_err(|e| FilmstripError::Compose(format!("failed to encode {format}: {e}")))?;
        commit(&path, &bytes)?;

        info!(
            ?path,
            %format,
            width = image.width(),
            height = image.height(),
            bytes = bytes.len(),
            "filmstrip written"
        );
        Ok(CompiledImage {
            image,
            path,
            format,
        })
    }
}

/// Place frames side by side. Widths may differ; heights must all match.
pub fn concat_horizontal(frames: &[Frame]) -> Result<RgbImage> {
    let first = frames.first().ok_or(FilmstripError::EmptySequence)?;
    let height = first.height();

    let mut total_width: u64 = 0;
    for (position, frame) in frames.iter().enumerate() {
        if frame.height() != height {
            return Err(FilmstripError::Compose(format!(
                "frame {} at position {position} is {} pixels high, expected {height}",
                frame.index,
                frame.height()
            )));
        }
        total_width += u64::from(frame.width());
    }
    let total_width = u32::try_from(total_width).map_err(|_| {
        FilmstripError::Compose(format!("concatenated width {total_width} is too large"))
    })?;

    let mut strip = RgbImage::new(total_width, height);
    let mut x: i64 = 0;
    for frame in frames {
        imageops::replace(&mut strip, &frame.image, x, 0);
        x += i64::from(frame.width());
    }
    Ok(strip)
}

fn encode(image: &RgbImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::new());
    if format.is_lossy() {
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(image)?;
    } else {
        image.write_to(&mut buf, format.image_format())?;
    }
    Ok(buf.into_inner())
}

/// Write `bytes` to `path` through a staging file, so a failure leaves nothing behind.
fn commit(path: &Path, bytes: &[u8]) -> Result<()> {
    write_staged(path, bytes).map_err(|e| {
        FilmstripError::Compose(format!("failed to write {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use image::Rgb;
    use tracing_test::traced_test;

    use super::*;

    fn frame(index: usize, width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        Frame {
            index,
            image: RgbImage::from_pixel(width, height, Rgb(rgb)),
        }
    }

    fn composer(canvas_width: u32, format: &str, quality: u8) -> FilmstripComposer {
        FilmstripComposer::new(ComposeConfig {
            canvas_width,
            format: format.into(),
            quality,
        })
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn three_wide_frames_make_7680_by_1920() {
        let frames: Vec<_> = (0..3).map(|i| frame(i, 100, 50, [0, 0, 0])).collect();
        let c = composer(CANVAS_WIDTH, "jpeg", 90);

        let layout = c.layout(&frames, 200).unwrap();
        assert_eq!((layout.width, layout.height), (7680, 1920));
        assert!((layout.avg_aspect - 2.0).abs() < 1e-9);

        let image = c.render(&frames, 200).unwrap();
        assert_eq!(image.dimensions(), (7680, 1920));
    }

    #[test]
    fn empty_sequence_is_rejected_without_io() {
        let dir = tempfile::tempdir().unwrap();
        let c = composer(64, "png", 100);

        let err = c.compose(&[], &dir.path().join("strip.png"), 100).unwrap_err();

        assert!(matches!(err, FilmstripError::EmptySequence));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    #[traced_test]
    fn unsupported_format_falls_back_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<_> = (0..2).map(|i| frame(i, 20, 10, [200, 10, 10])).collect();
        let c = composer(64, "bogus", 80);

        let out = c.compose(&frames, &dir.path().join("strip.bogus"), 20).unwrap();

        assert_eq!(out.format, OutputFormat::Jpeg);
        assert_eq!(out.path, dir.path().join("strip.jpeg"));
        assert!(logs_contain("unsupported output format"));
        let written = image::open(&out.path).unwrap();
        assert_eq!((written.width(), written.height()), (64, 32));
        assert_eq!(files_in(dir.path()), vec![dir.path().join("strip.jpeg")]);
    }

    #[test]
    fn format_names_ignore_case() {
        assert_eq!(OutputFormat::parse("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("Jpg"), Some(OutputFormat::Jpg));
        assert_eq!(OutputFormat::parse("TIFF"), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::parse("webp"), None);
        assert_eq!(OutputFormat::resolve("JPG").extension(), "jpg");
    }

    #[test]
    fn png_output_is_lossless_and_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![frame(0, 20, 10, [255, 0, 0]), frame(1, 20, 10, [0, 0, 255])];
        // 40 / 2.0 = 20 high; 20 * 20 / 10 = 40 wide, so the strip is only stretched vertically.
        let c = composer(40, "png", 5);

        let out = c.compose(&frames, &dir.path().join("strip.jpeg"), 20).unwrap();

        assert_eq!(out.path, dir.path().join("strip.png"));
        let written = image::open(&out.path).unwrap().into_rgb8();
        assert_eq!(written.dimensions(), (40, 20));
        assert_eq!(written.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(written.get_pixel(39, 19), &Rgb([0, 0, 255]));
    }

    #[test]
    fn tiff_output_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![frame(0, 16, 8, [1, 2, 3])];
        let c = composer(32, "tiff", 100);

        let out = c.compose(&frames, &dir.path().join("strip"), 16).unwrap();

        assert_eq!(out.path, dir.path().join("strip.tiff"));
        let written = image::open(&out.path).unwrap();
        assert_eq!((written.width(), written.height()), (32, 16));
    }

    #[test]
    fn mixed_widths_are_concatenated_in_order() {
        let frames = vec![frame(0, 30, 10, [255, 0, 0]), frame(1, 10, 10, [0, 255, 0])];

        let strip = concat_horizontal(&frames).unwrap();

        assert_eq!(strip.dimensions(), (40, 10));
        assert_eq!(strip.get_pixel(29, 5), &Rgb([255, 0, 0]));
        assert_eq!(strip.get_pixel(30, 5), &Rgb([0, 255, 0]));
    }

    #[test]
    fn mixed_aspect_layout_uses_the_mean() {
        let frames = vec![frame(0, 100, 50, [0, 0, 0]), frame(1, 50, 50, [0, 0, 0])];
        let c = composer(64, "jpeg", 100);

        let layout = c.layout(&frames, 100).unwrap();

        // mean aspect 1.5 -> 64 / 1.5 = 42.67 -> 43; 100 * 43 / 50 = 86
        assert!((layout.avg_aspect - 1.5).abs() < 1e-9);
        assert_eq!((layout.width, layout.height), (86, 43));
    }

    #[test]
    #[traced_test]
    fn height_mismatch_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![frame(0, 20, 10, [0, 0, 0]), frame(1, 20, 12, [0, 0, 0])];
        let c = composer(64, "jpeg", 100);

        let err = c.compose(&frames, &dir.path().join("strip.jpeg"), 20).unwrap_err();

        assert!(matches!(err, FilmstripError::Compose(_)));
        assert!(files_in(dir.path()).is_empty());
        assert!(logs_contain("failed to compose filmstrip"));
    }

    #[test]
    fn missing_output_directory_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![frame(0, 20, 10, [0, 0, 0])];
        let c = composer(64, "jpeg", 100);

        let err = c
            .compose(&frames, &dir.path().join("missing/strip.jpeg"), 20)
            .unwrap_err();

        assert!(matches!(err, FilmstripError::Compose(_)));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn quality_above_100_is_rejected() {
        let frames = vec![frame(0, 20, 10, [0, 0, 0])];
        let err = composer(64, "jpeg", 101).render(&frames, 20).unwrap_err();
        assert!(matches!(err, FilmstripError::InvalidConfig(_)));
    }
}
