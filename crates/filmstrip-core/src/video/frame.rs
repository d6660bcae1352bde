use image::RgbImage;

/// Order of the three color channels in a frame's pixel data.
///
/// The built-in sources ([`DirectoryFrames`](super::DirectoryFrames) and
/// [`VideoDecoder`](super::VideoDecoder)) are natively RGB; `Bgr` is for frames handed in
/// by callers whose capture produces BGR, such as OpenCV-style buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A single frame as it comes out of a frame source, before normalization.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Pixel data, laid out in `order`.
    pub image: RgbImage,
    /// Channel order of `image`.
    pub order: ChannelOrder,
}

impl SourceFrame {
    pub fn rgb(image: RgbImage) -> Self {
        Self {
            image,
            order: ChannelOrder::Rgb,
        }
    }

    /// Wrap BGR pixel data. The extractor swaps it to RGB exactly once.
    pub fn bgr(image: RgbImage) -> Self {
        Self {
            image,
            order: ChannelOrder::Bgr,
        }
    }
}

/// A normalized frame: resized, converted to RGB and persisted.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position of the frame in its source, counting frames that were skipped.
    pub index: usize,
    pub image: RgbImage,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Frames in source order.
pub type FrameSequence = Vec<Frame>;

/// Swap an image from `order` into RGB. A no-op for frames that are already RGB.
pub fn to_rgb(mut image: RgbImage, order: ChannelOrder) -> RgbImage {
    if order == ChannelOrder::Bgr {
        for pixel in image.pixels_mut() {
            pixel.0.swap(0, 2);
        }
    }
    image
}
