mod file;

pub use file::FileSource;

use crate::error::Result;
use crate::segmentation::{ChannelOrder, PixelBuffer};

/// Trait for image sources
pub trait ImageSource {
    /// Decode the image resized to exactly `width` x `height`, laid out in `order`
    fn decode(&self, width: u32, height: u32, order: ChannelOrder) -> Result<PixelBuffer>;

    /// Get the resolution of the undecoded image, when known
    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }
}
