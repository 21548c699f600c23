use super::numeric::NormalizationParams;
use super::types::{AlphaMode, Channel, ChannelOrder, PixelBuffer, Tensor};
use crate::error::{Error, Result};
use ndarray::Array4;

/// Number of color planes in the network input
pub const INPUT_PLANES: usize = 3;

/// Which color channel feeds each tensor plane, and how that plane is normalized
///
/// The encoder and `TensorEncoder::restore` both read this table, so the
/// plane order is stated once instead of being implied by two call sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneMapping {
    planes: [(Channel, NormalizationParams); INPUT_PLANES],
}

impl PlaneMapping {
    /// U²-Net reference layout: plane0 <- blue, plane1 <- red, plane2 <- green,
    /// each with its ImageNet mean / std
    pub const U2NET_BRG: PlaneMapping = PlaneMapping {
        planes: [
            (Channel::Blue, NormalizationParams::new(0.406, 0.225)),
            (Channel::Red, NormalizationParams::new(0.485, 0.229)),
            (Channel::Green, NormalizationParams::new(0.456, 0.224)),
        ],
    };

    /// Build a custom mapping
    ///
    /// The three channels must be distinct color channels and every
    /// `std_dev` must be positive.
    pub fn new(planes: [(Channel, NormalizationParams); INPUT_PLANES]) -> Result<Self> {
        for (index, (channel, params)) in planes.iter().enumerate() {
            if *channel == Channel::Alpha {
                return Err(Error::InvalidParameter {
                    name: format!("plane{index}"),
                    reason: "alpha cannot feed a color plane".to_string(),
                });
            }
            if planes[..index].iter().any(|(other, _)| other == channel) {
                return Err(Error::InvalidParameter {
                    name: format!("plane{index}"),
                    reason: format!("{channel:?} is already mapped to another plane"),
                });
            }
            if params.std_dev.is_nan() || params.std_dev <= 0.0 {
                return Err(Error::InvalidParameter {
                    name: format!("plane{index}"),
                    reason: format!("std_dev must be positive, got {}", params.std_dev),
                });
            }
        }

        Ok(Self { planes })
    }

    /// Color channel drawn into `plane`
    pub fn channel(&self, plane: usize) -> Channel {
        self.planes[plane].0
    }

    /// Normalization applied to `plane`
    pub fn params(&self, plane: usize) -> NormalizationParams {
        self.planes[plane].1
    }
}

impl Default for PlaneMapping {
    fn default() -> Self {
        Self::U2NET_BRG
    }
}

/// Tensor encoder for converting pixel buffers to model input tensors
pub struct TensorEncoder {
    mapping: PlaneMapping,
}

impl TensorEncoder {
    pub fn new(mapping: PlaneMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &PlaneMapping {
        &self.mapping
    }

    /// Encode an interleaved pixel buffer into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Pick each plane's source byte through the buffer's channel order
    /// 2. Scale to [0, 1] and normalize with that plane's mean / std
    /// 3. Transpose from interleaved HWC to planar NCHW
    ///
    /// Alpha is dropped.
    ///
    /// Returns: tensor with shape [1, 3, height, width]
    pub fn encode(&self, buffer: &PixelBuffer) -> Tensor {
        let _span = tracing::debug_span!("encode").entered();

        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let order = buffer.order();
        let offsets = self.mapping.planes.map(|(channel, _)| order.offset(channel));

        let mut tensor = Array4::<f32>::zeros((1, INPUT_PLANES, height, width));

        for (index, pixel) in buffer.pixels().enumerate() {
            let y = index / width;
            let x = index % width;

            for (plane, offset) in offsets.iter().enumerate() {
                tensor[[0, plane, y, x]] = self.mapping.params(plane).normalize(pixel[*offset]);
            }
        }

        Tensor::from_array(tensor)
    }

    /// Undo `encode`: denormalize each plane and put it back at its channel
    ///
    /// Alpha is not carried by the tensor, so every output pixel is opaque.
    ///
    /// # Panics
    /// If `tensor` is not shaped [1, 3, H, W].
    pub fn restore(&self, tensor: &Tensor, order: ChannelOrder) -> PixelBuffer {
        let _span = tracing::debug_span!("restore").entered();

        let (height, width) = match tensor.shape() {
            &[1, INPUT_PLANES, height, width] => (height, width),
            other => panic!("expected a [1, 3, H, W] input tensor, got {:?}", other),
        };

        let plane_len = height * width;
        let values = tensor.as_slice();
        let mut data = Vec::with_capacity(plane_len * 4);

        for index in 0..plane_len {
            let mut pixel = order.pack(0, 0, 0, u8::MAX);
            for (plane, (channel, params)) in self.mapping.planes.iter().enumerate() {
                pixel[order.offset(*channel)] =
                    params.denormalize(values[plane * plane_len + index]);
            }
            data.extend_from_slice(&pixel);
        }

        PixelBuffer::new(
            width as u32,
            height as u32,
            order,
            AlphaMode::Straight,
            data,
        )
    }
}

impl Default for TensorEncoder {
    fn default() -> Self {
        Self::new(PlaneMapping::U2NET_BRG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, order: ChannelOrder) -> PixelBuffer {
        let data = (0..width * height)
            .flat_map(|i| {
                let v = (i * 7 % 256) as u8;
                [v, v.wrapping_mul(3), v.wrapping_add(91), (i % 256) as u8]
            })
            .collect();
        PixelBuffer::new(width, height, order, AlphaMode::Straight, data)
    }

    #[test]
    fn test_tensor_shape() {
        let buffer = gradient(5, 3, ChannelOrder::Rgba);
        let tensor = TensorEncoder::default().encode(&buffer);

        assert_eq!(tensor.shape(), &[1, 3, 3, 5]);
        assert_eq!(tensor.len(), 3 * 5 * 3);
    }

    #[test]
    fn test_reference_plane_permutation() {
        let buffer = PixelBuffer::new(
            1,
            1,
            ChannelOrder::Rgba,
            AlphaMode::Straight,
            vec![10, 20, 30, 255],
        );
        let mapping = PlaneMapping::U2NET_BRG;
        let tensor = TensorEncoder::new(mapping).encode(&buffer);

        assert_eq!(
            tensor.as_slice(),
            &[
                mapping.params(0).normalize(30),
                mapping.params(1).normalize(10),
                mapping.params(2).normalize(20),
            ]
        );
        assert_eq!(tensor.as_slice()[0], ((30.0f64 / 255.0 - 0.406) / 0.225) as f32);
    }

    #[test]
    fn test_channel_order_is_respected() {
        let rgba = gradient(4, 4, ChannelOrder::Rgba);
        let bgra = rgba.reordered(ChannelOrder::Bgra);
        let encoder = TensorEncoder::default();

        assert_eq!(encoder.encode(&rgba), encoder.encode(&bgra));
    }

    #[test]
    fn test_planar_layout() {
        // Two pixels: plane0 (blue) holds both blues before any red
        let buffer = PixelBuffer::new(
            2,
            1,
            ChannelOrder::Rgba,
            AlphaMode::Straight,
            vec![1, 2, 3, 0, 4, 5, 6, 0],
        );
        let mapping = PlaneMapping::U2NET_BRG;
        let tensor = TensorEncoder::new(mapping).encode(&buffer);
        let expected: Vec<f32> = [(0, 3), (0, 6), (1, 1), (1, 4), (2, 2), (2, 5)]
            .iter()
            .map(|&(plane, byte)| mapping.params(plane).normalize(byte))
            .collect();

        assert_eq!(tensor.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque = PixelBuffer::new(1, 1, ChannelOrder::Rgba, AlphaMode::Straight, vec![9, 8, 7, 255]);
        let clear = PixelBuffer::new(1, 1, ChannelOrder::Rgba, AlphaMode::Straight, vec![9, 8, 7, 0]);
        let encoder = TensorEncoder::default();

        assert_eq!(encoder.encode(&opaque), encoder.encode(&clear));
    }

    #[test]
    fn test_restore_round_trip() {
        let buffer = gradient(16, 16, ChannelOrder::Rgba);
        let encoder = TensorEncoder::default();
        let restored = encoder.restore(&encoder.encode(&buffer), ChannelOrder::Rgba);

        for (original, restored) in buffer.pixels().zip(restored.pixels()) {
            for channel in 0..3 {
                let diff = (i16::from(original[channel]) - i16::from(restored[channel])).abs();
                assert!(diff <= 1, "{original:?} vs {restored:?}");
            }
            assert_eq!(restored[3], 255);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let buffer = gradient(8, 8, ChannelOrder::Bgra);
        let encoder = TensorEncoder::default();

        assert_eq!(encoder.encode(&buffer), encoder.encode(&buffer));
    }

    #[test]
    fn test_mapping_rejects_duplicates() {
        let params = NormalizationParams::new(0.5, 0.5);
        let result = PlaneMapping::new([
            (Channel::Red, params),
            (Channel::Red, params),
            (Channel::Green, params),
        ]);
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_mapping_rejects_alpha_and_zero_std() {
        let params = NormalizationParams::new(0.5, 0.5);
        assert!(PlaneMapping::new([
            (Channel::Alpha, params),
            (Channel::Red, params),
            (Channel::Green, params),
        ])
        .is_err());
        assert!(PlaneMapping::new([
            (Channel::Blue, NormalizationParams::new(0.5, 0.0)),
            (Channel::Red, params),
            (Channel::Green, params),
        ])
        .is_err());
        assert!(PlaneMapping::new([
            (Channel::Blue, NormalizationParams::new(0.5, f64::NAN)),
            (Channel::Red, params),
            (Channel::Green, params),
        ])
        .is_err());
    }

    #[test]
    #[should_panic(expected = "[1, 3, H, W]")]
    fn test_restore_rejects_mask_tensor() {
        let tensor = Tensor::from_shape_vec(&[1, 1, 1, 1], vec![0.0]).unwrap();
        TensorEncoder::default().restore(&tensor, ChannelOrder::Rgba);
    }
}
