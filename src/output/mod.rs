mod png;

pub use png::{to_rgba_image, PngSink};

use crate::error::Result;
use crate::segmentation::PixelBuffer;

/// Trait for output destinations
pub trait OutputSink {
    /// Render one named frame
    fn write_frame(&mut self, name: &str, frame: &PixelBuffer) -> Result<()>;
}
