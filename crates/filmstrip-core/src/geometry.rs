//! Aspect-ratio arithmetic shared by the extractor and the composer.

/// Width divided by height as a float.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    assert!(height > 0, "aspect ratio of a zero-height raster");
    width as f64 / height as f64
}

/// Height of a raster resized to `target_width` while keeping `aspect`.
///
/// Never returns 0: a very wide source at a tiny target width still gets one row.
pub fn scaled_height(target_width: u32, aspect: f64) -> u32 {
    let h = (target_width as f64 / aspect).round();
    (h as u32).max(1)
}

/// Mean aspect ratio of a set of `(width, height)` pairs, or `None` for an empty set.
pub fn mean_aspect_ratio(dims: impl IntoIterator<Item = (u32, u32)>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (w, h) in dims {
        sum += aspect_ratio(w, h);
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Filmstrip height derived from the fixed canvas width and the average aspect ratio.
pub fn canvas_height(canvas_width: u32, avg_aspect: f64) -> u32 {
    scaled_height(canvas_width, avg_aspect)
}

/// Output width that keeps `original_width` proportional to the move from
/// `first_frame_height` to `canvas_height`.
pub fn dynamic_width(original_width: u32, canvas_height: u32, first_frame_height: u32) -> u32 {
    assert!(first_frame_height > 0, "first frame has zero height");
    let w = (original_width as f64 * (canvas_height as f64 / first_frame_height as f64)).round();
    (w as u32).max(1)
}
