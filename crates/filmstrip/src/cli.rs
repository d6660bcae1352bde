use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "filmstrip",
    about = "Normalize video frames and join them into one filmstrip image"
)]
pub struct Cli {
    /// Folder holding the decoded frames; normalized frames are written here too.
    #[arg(default_value = "frames_output")]
    pub output_folder: PathBuf,

    /// Input video. Defaults to the first video found in the current directory.
    pub input_video: Option<PathBuf>,

    /// Path of the compiled filmstrip. The extension follows --output-format.
    #[arg(long, default_value = "compiled_img.jpeg")]
    pub output_image_path: PathBuf,

    /// Width every frame is resized to.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub output_width: u32,

    /// Filmstrip format: jpeg, jpg, png or tiff. Anything else falls back to jpeg.
    #[arg(long, default_value = "jpeg")]
    pub output_format: String,

    /// Quality for lossy formats (0-100).
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub image_quality: u8,

    /// Extensions considered when looking for a video in the current directory.
    #[arg(long, num_args = 1.., default_values_t = [".mp4", ".mov", ".avi", ".mkv"].map(String::from))]
    pub video_extensions: Vec<String>,

    /// Decode frames from the video instead of reading them from the output folder.
    #[arg(long)]
    pub decode: bool,
}
