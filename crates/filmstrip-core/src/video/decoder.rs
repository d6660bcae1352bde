use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use image::RgbImage;
use tracing::{debug, error, info, warn};

use super::frame::SourceFrame;
use crate::error::{FilmstripError, Result};

/// Stream properties of a video, as reported by ffprobe.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Total frame count. `None` when the container does not report one.
    pub frame_count: Option<u64>,
    pub fps: f64,
    /// Four-character codec tag, e.g. `avc1`.
    pub codec_tag: String,
}

impl VideoInfo {
    /// Probe the first video stream of `path` with ffprobe.
    pub fn probe(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(open_error(path, "file does not exist"));
        }

        info!(?path, "probing video metadata with ffprobe");

        let output = Command::new("ffprobe")
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height,r_frame_rate,nb_frames,codec_tag_string",
                "-of", "default=noprint_wrappers=1",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| open_error(path, format!("failed to run ffprobe, is ffmpeg installed? {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(%stderr, ?path, "ffprobe failed");
            return Err(open_error(path, format!("ffprobe failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_probe_output(&stdout).map_err(|reason| open_error(path, reason))?;

        info!(
            width = info.width,
            height = info.height,
            frame_count = ?info.frame_count,
            fps = info.fps,
            codec = %info.codec_tag,
            "probe completed"
        );
        Ok(info)
    }

    /// Playback length in seconds, when both frame count and fps are known.
    pub fn duration_seconds(&self) -> Option<f64> {
        match self.frame_count {
            Some(n) if self.fps > 0.0 => Some(n as f64 / self.fps),
            _ => None,
        }
    }
}

fn open_error(path: &Path, reason: impl Into<String>) -> FilmstripError {
    FilmstripError::SourceOpen {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Parse ffprobe's `key=value` stream listing.
fn parse_probe_output(stdout: &str) -> std::result::Result<VideoInfo, String> {
    let fields: HashMap<&str, &str> = stdout
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .collect();

    let field = |key: &str| {
        fields
            .get(key)
            .copied()
            .ok_or_else(|| format!("ffprobe output is missing `{key}`: {stdout}"))
    };

    let width: u32 = field("width")?
        .parse()
        .map_err(|e| format!("failed to parse width: {e}"))?;
    let height: u32 = field("height")?
        .parse()
        .map_err(|e| format!("failed to parse height: {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("invalid video dimensions: {width}x{height}"));
    }

    let fps = match fields.get("r_frame_rate") {
        Some(rate) => parse_frame_rate(rate)?,
        None => 0.0,
    };
    if fps <= 0.0 {
        warn!(fps, "video has non-positive fps, duration will be unknown");
    }

    // Containers such as MKV report "N/A" here.
    let frame_count = fields.get("nb_frames").and_then(|n| n.parse().ok());

    let codec_tag = fields
        .get("codec_tag_string")
        .map(|s| s.to_string())
        .unwrap_or_default();

    Ok(VideoInfo {
        width,
        height,
        frame_count,
        fps,
        codec_tag,
    })
}

fn parse_frame_rate(rate: &str) -> std::result::Result<f64, String> {
    if let Some((num, den)) = rate.split_once('/') {
        let num: f64 = num
            .parse()
            .map_err(|e| format!("failed to parse fps numerator: {e}"))?;
        let den: f64 = den
            .parse()
            .map_err(|e| format!("failed to parse fps denominator: {e}"))?;
        Ok(if den > 0.0 { num / den } else { 0.0 })
    } else {
        rate.parse().map_err(|e| format!("failed to parse fps: {e}"))
    }
}

/// Decodes video frames by piping raw RGB24 data from the ffmpeg CLI, so every frame it
/// yields is natively RGB.
///
/// The ffmpeg process is the video handle: it is spawned by [`VideoDecoder::open`] and
/// killed and reaped exactly once, when the decoder is dropped.
pub struct VideoDecoder {
    child: Child,
    path: PathBuf,
    info: VideoInfo,
    frames_read: usize,
    frame_bytes: usize,
    finished: bool,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open(path: &Path) -> Result<Self> {
        let info = VideoInfo::probe(path)?;

        info!(?path, "spawning ffmpeg decoder process");

        let child = Command::new("ffmpeg")
            .args(["-i"])
            .arg(path)
            .args([
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-v", "error",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| open_error(path, format!("failed to spawn ffmpeg, is ffmpeg installed? {e}")))?;

        let frame_bytes = (info.width as usize) * (info.height as usize) * 3;

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            frame_bytes,
            "video decoder opened"
        );

        Ok(Self {
            child,
            path: path.to_path_buf(),
            info,
            frames_read: 0,
            frame_bytes,
            finished: false,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Read the next frame from the ffmpeg pipe, or `None` if the video is finished.
    fn read_frame(&mut self) -> Result<Option<SourceFrame>> {
        let index = self.frames_read;
        let stdout = self
            .child
            .stdout
            .as_mut()
            .ok_or_else(|| FilmstripError::FrameDecode {
                index,
                reason: "ffmpeg stdout not available".into(),
            })?;

        let mut buf = vec![0u8; self.frame_bytes];
        let mut read = 0;

        while read < self.frame_bytes {
            match stdout.read(&mut buf[read..]) {
                Ok(0) => {
                    if read == 0 {
                        info!(total_frames = self.frames_read, "video stream ended");
                        return Ok(None);
                    }
                    error!(
                        read_bytes = read,
                        expected_bytes = self.frame_bytes,
                        frame_index = index,
                        "ffmpeg stream ended mid-frame"
                    );
                    return Err(FilmstripError::FrameDecode {
                        index,
                        reason: format!(
                            "ffmpeg stream ended mid-frame (read {read}/{} bytes)",
                            self.frame_bytes
                        ),
                    });
                }
                Ok(n) => read += n,
                Err(e) => {
                    error!(frame_index = index, %e, "failed to read from ffmpeg pipe");
                    return Err(FilmstripError::FrameDecode {
                        index,
                        reason: format!("failed to read from ffmpeg pipe: {e}"),
                    });
                }
            }
        }

        let image = RgbImage::from_raw(self.info.width, self.info.height, buf).ok_or_else(|| {
            FilmstripError::FrameDecode {
                index,
                reason: "raw frame does not match the probed dimensions".into(),
            }
        })?;
        self.frames_read += 1;

        debug!(frame_index = index, "decoded frame");
        Ok(Some(SourceFrame::rgb(image)))
    }
}

impl Iterator for VideoDecoder {
    type Item = Result<SourceFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                // A broken pipe cannot resynchronize on a frame boundary.
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        info!(path = ?self.path, total_frames = self.frames_read, "closing video decoder");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
