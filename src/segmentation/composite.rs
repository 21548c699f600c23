//! Background removal by masking the source image with the fused matte.

use super::numeric::{clamp_unit, round_to_byte, unit_to_byte};
use super::types::{AlphaMode, Channel, ChannelOrder, PixelBuffer, Tensor, BYTES_PER_PIXEL};
use crate::error::{Error, Result};

/// Applies a probability mask to an image as premultiplied alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskCompositor {
    cutoff: f32,
    output_order: ChannelOrder,
}

impl MaskCompositor {
    /// Create a compositor
    ///
    /// # Arguments
    /// * `cutoff` - Pixels whose clamped probability is not above this are
    ///   cleared to transparent black. Must be within [0, 1].
    /// * `output_order` - Channel order of the composited buffer
    pub fn new(cutoff: f32, output_order: ChannelOrder) -> Result<Self> {
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(Error::InvalidParameter {
                name: "cutoff".to_string(),
                reason: format!("must be within [0, 1], got {cutoff}"),
            });
        }

        Ok(Self {
            cutoff,
            output_order,
        })
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn output_order(&self) -> ChannelOrder {
        self.output_order
    }

    /// Keep the foreground of `image`, premultiplied by the mask
    ///
    /// For each pixel, `alpha = clamp(mask, 0, 1)`. Above the cutoff the
    /// color channels become `round(color * alpha)` and the alpha byte
    /// `round(alpha * 255)`; otherwise all four bytes are 0. The source
    /// alpha byte is not consulted.
    ///
    /// # Panics
    /// If the mask is not [1, 1, H, W] with the image's width and height.
    pub fn composite(&self, image: &PixelBuffer, mask: &Tensor) -> PixelBuffer {
        let _span = tracing::debug_span!("composite").entered();

        let (height, width) = mask.mask_dims();
        assert_eq!(
            (width, height),
            (image.width() as usize, image.height() as usize),
            "mask and image resolution differ"
        );

        let source_order = image.order();
        let mut data = Vec::with_capacity(image.pixel_count() * BYTES_PER_PIXEL);

        for (pixel, &probability) in image.pixels().zip(mask.as_slice()) {
            let alpha = clamp_unit(probability);

            if alpha > self.cutoff {
                let scale = |channel: Channel| {
                    round_to_byte(f32::from(pixel[source_order.offset(channel)]) * alpha)
                };
                data.extend_from_slice(&self.output_order.pack(
                    scale(Channel::Red),
                    scale(Channel::Green),
                    scale(Channel::Blue),
                    unit_to_byte(alpha),
                ));
            } else {
                data.extend_from_slice(&[0; BYTES_PER_PIXEL]);
            }
        }

        PixelBuffer::new(
            image.width(),
            image.height(),
            self.output_order,
            AlphaMode::Premultiplied,
            data,
        )
    }
}

impl Default for MaskCompositor {
    fn default() -> Self {
        Self {
            cutoff: 0.0,
            output_order: ChannelOrder::Bgra,
        }
    }
}
