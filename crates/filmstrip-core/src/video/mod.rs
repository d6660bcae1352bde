pub mod decoder;
pub mod directory;
pub mod frame;

pub use decoder::{VideoDecoder, VideoInfo};
pub use directory::DirectoryFrames;
pub use frame::{ChannelOrder, Frame, FrameSequence, SourceFrame};
