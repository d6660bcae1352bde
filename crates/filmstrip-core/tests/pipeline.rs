use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

use filmstrip_core::pipeline::PipelineConfig;
use filmstrip_core::video::DirectoryFrames;
use filmstrip_core::{
    run_with_frames, ComposeConfig, ExtractConfig, FilmstripError, NoProgress, VideoInfo,
};

fn video(width: u32, height: u32, frame_count: Option<u64>) -> VideoInfo {
    VideoInfo {
        width,
        height,
        frame_count,
        fps: 25.0,
        codec_tag: "avc1".into(),
    }
}

fn write_raw_frames(dir: &Path, count: usize, width: u32, height: u32) {
    for i in 0..count {
        let shade = (i * 60) as u8;
        RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, 128]))
            .save(dir.join(format!("frame_{i:04}.jpeg")))
            .unwrap();
    }
}

fn config(dir: &Path, target_width: u32, canvas_width: u32, format: &str) -> PipelineConfig {
    PipelineConfig {
        video: dir.join("input.mp4"),
        frames_dir: dir.to_path_buf(),
        output_path: dir.join("compiled_img.jpeg"),
        extract: ExtractConfig {
            target_width,
            jpeg_quality: 95,
        },
        compose: ComposeConfig {
            canvas_width,
            format: format.into(),
            quality: 90,
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn frames_in_directory_become_one_filmstrip() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_frames(dir.path(), 3, 200, 100);
    let config = config(dir.path(), 100, 384, "png");

    let frames = DirectoryFrames::scan(dir.path()).unwrap();
    let report = run_with_frames(&config, video(200, 100, Some(3)), frames, &NoProgress).unwrap();

    assert_eq!(report.frames_written, 3);
    for i in 0..3 {
        let frame = image::open(dir.path().join(format!("frame_{i:04}.jpeg"))).unwrap();
        assert_eq!((frame.width(), frame.height()), (100, 50));
    }

    // canvas 384 / aspect 2.0 = 192 high; first frame 100 wide * 192 / 50 = 384 wide
    let compiled = report.compiled.expect("filmstrip written");
    assert_eq!(compiled, dir.path().join("compiled_img.png"));
    let strip = image::open(&compiled).unwrap();
    assert_eq!((strip.width(), strip.height()), (384, 192));
}

#[test]
fn empty_directory_reports_no_frames() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), 100, 384, "jpeg");

    let frames = DirectoryFrames::scan(dir.path()).unwrap();
    let err = run_with_frames(&config, video(200, 100, Some(10)), frames, &NoProgress).unwrap_err();

    assert!(matches!(err, FilmstripError::NoFramesCaptured));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn compose_failure_keeps_frames_and_skips_output() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_frames(dir.path(), 2, 40, 20);
    let mut config = config(dir.path(), 20, 64, "jpeg");
    config.output_path = dir.path().join("missing").join("strip.jpeg");

    let frames = DirectoryFrames::scan(dir.path()).unwrap();
    let report = run_with_frames(&config, video(40, 20, None), frames, &NoProgress).unwrap();

    assert_eq!(report.frames_written, 2);
    assert!(report.compiled.is_none());
    assert!(dir.path().join("frame_0001.jpeg").is_file());
    assert!(!dir.path().join("missing").exists());
}

#[test]
fn separate_output_directory_leaves_inputs_untouched() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_raw_frames(input.path(), 2, 40, 20);
    let before = fs::read(input.path().join("frame_0000.jpeg")).unwrap();

    let mut config = config(output.path(), 20, 64, "jpg");
    config.output_path = output.path().join("strip");

    let frames = DirectoryFrames::scan(input.path()).unwrap();
    let report = run_with_frames(&config, video(40, 20, Some(2)), frames, &NoProgress).unwrap();

    assert_eq!(report.compiled, Some(output.path().join("strip.jpg")));
    assert_eq!(fs::read(input.path().join("frame_0000.jpeg")).unwrap(), before);
    assert!(output.path().join("frame_0001.jpeg").is_file());
}
