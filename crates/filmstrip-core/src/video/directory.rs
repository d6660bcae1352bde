use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::frame::SourceFrame;
use crate::error::{FilmstripError, Result};

/// Extension of the frame files a directory source picks up.
pub const FRAME_EXTENSION: &str = "jpeg";

/// Frames stored as `*.jpeg` files in a directory, yielded in filename order.
///
/// Frames come out natively RGB, as the `image` crate decodes them.
///
/// The listing is taken once by [`DirectoryFrames::scan`]; files are decoded lazily.
pub struct DirectoryFrames {
    files: std::vec::IntoIter<PathBuf>,
    position: usize,
}

impl DirectoryFrames {
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_frame = path.extension().is_some_and(|ext| ext == FRAME_EXTENSION);
            if is_frame && entry.file_type()?.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        info!(?dir, frame_files = files.len(), "frame directory scanned");

        Ok(Self {
            files: files.into_iter(),
            position: 0,
        })
    }

    /// Number of frame files not yet yielded.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl Iterator for DirectoryFrames {
    type Item = Result<SourceFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.next()?;
        let index = self.position;
        self.position += 1;

        debug!(?path, frame_index = index, "reading frame file");
        let frame = image::open(&path)
            .map(|img| SourceFrame::rgb(img.into_rgb8()))
            .map_err(|e| FilmstripError::FrameDecode {
                index,
                reason: format!("{}: {e}", path.display()),
            });
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(4, 2, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn frames_are_sorted_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b_0002.jpeg", 200);
        write_frame(dir.path(), "a_0010.jpeg", 0);
        write_frame(dir.path(), "a_0002.jpeg", 100);

        let shades: Vec<u8> = DirectoryFrames::scan(dir.path())
            .unwrap()
            .map(|f| f.unwrap().image.get_pixel(0, 0)[0])
            .collect();

        assert_eq!(shades.len(), 3);
        // a_0002 < a_0010 < b_0002; JPEG is lossy so compare loosely.
        assert!(shades[0].abs_diff(100) < 8);
        assert!(shades[1] < 8);
        assert!(shades[2].abs_diff(200) < 8);
    }

    #[test]
    fn other_files_and_directories_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame_0000.jpeg", 50);
        write_frame(dir.path(), "frame_0001.png", 50);
        fs::create_dir(dir.path().join("nested.jpeg")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let frames = DirectoryFrames::scan(dir.path()).unwrap();
        assert_eq!(frames.remaining(), 1);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(DirectoryFrames::scan(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_file_is_a_per_frame_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("frame_0000.jpeg"), b"not a jpeg").unwrap();
        write_frame(dir.path(), "frame_0001.jpeg", 50);

        let results: Vec<_> = DirectoryFrames::scan(dir.path()).unwrap().collect();
        assert!(matches!(
            results[0],
            Err(FilmstripError::FrameDecode { index: 0, .. })
        ));
        assert!(results[1].is_ok());
    }
}
