use super::numeric::unit_to_byte;
use super::types::{AlphaMode, ChannelOrder, PixelBuffer, Tensor};

/// Turns single-channel probability maps into viewable images
pub struct TensorDecoder;

impl TensorDecoder {
    /// Convert a [1, 1, H, W] matte to an opaque grayscale image for visualization
    ///
    /// Values are clamped to [0, 1] before scaling, so out-of-range edge
    /// artifacts saturate instead of wrapping.
    ///
    /// # Panics
    /// If the tensor is not shaped [1, 1, H, W].
    pub fn to_grayscale(mask: &Tensor, order: ChannelOrder) -> PixelBuffer {
        let _span = tracing::debug_span!("decode").entered();

        let (height, width) = mask.mask_dims();

        let data = mask
            .as_slice()
            .iter()
            .flat_map(|&value| {
                let v = unit_to_byte(value);
                order.pack(v, v, v, u8::MAX)
            })
            .collect();

        // Opaque pixels read the same in either alpha mode
        PixelBuffer::new(
            width as u32,
            height as u32,
            order,
            AlphaMode::Premultiplied,
            data,
        )
    }
}
