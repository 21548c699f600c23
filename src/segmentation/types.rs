use crate::error::{Error, Result};
use image::RgbaImage;
use ndarray::{Array, ArrayD, ArrayViewD, Dimension, IxDyn};
use std::fmt;

/// Bytes per pixel in every `PixelBuffer`
pub const BYTES_PER_PIXEL: usize = 4;

/// One component of a 4-byte pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

/// Byte layout of a pixel inside a `PixelBuffer`
///
/// The order is a property of the buffer, never implied by the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// byte0=R, byte1=G, byte2=B, byte3=A
    Rgba,
    /// byte0=B, byte1=G, byte2=R, byte3=A
    Bgra,
}

impl ChannelOrder {
    /// Byte offset of `channel` within one pixel
    pub const fn offset(self, channel: Channel) -> usize {
        match (self, channel) {
            (ChannelOrder::Rgba, Channel::Red) => 0,
            (ChannelOrder::Rgba, Channel::Green) => 1,
            (ChannelOrder::Rgba, Channel::Blue) => 2,
            (ChannelOrder::Bgra, Channel::Blue) => 0,
            (ChannelOrder::Bgra, Channel::Green) => 1,
            (ChannelOrder::Bgra, Channel::Red) => 2,
            (_, Channel::Alpha) => 3,
        }
    }

    /// Lay out straight RGBA components in this order
    pub fn pack(self, red: u8, green: u8, blue: u8, alpha: u8) -> [u8; BYTES_PER_PIXEL] {
        let mut pixel = [0u8; BYTES_PER_PIXEL];
        pixel[self.offset(Channel::Red)] = red;
        pixel[self.offset(Channel::Green)] = green;
        pixel[self.offset(Channel::Blue)] = blue;
        pixel[self.offset(Channel::Alpha)] = alpha;
        pixel
    }

    /// Read one pixel laid out in this order back as `[r, g, b, a]`
    pub fn unpack(self, pixel: &[u8]) -> [u8; BYTES_PER_PIXEL] {
        [
            pixel[self.offset(Channel::Red)],
            pixel[self.offset(Channel::Green)],
            pixel[self.offset(Channel::Blue)],
            pixel[self.offset(Channel::Alpha)],
        ]
    }
}

/// Whether color bytes are already scaled by alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    Straight,
    Premultiplied,
}

/// Fixed-size raw image: `width * height` pixels of 4 bytes each
///
/// Immutable once built. Conversions return a new buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    order: ChannelOrder,
    alpha_mode: AlphaMode,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw pixel bytes
    ///
    /// # Panics
    /// If `data.len() != width * height * 4`.
    pub fn new(
        width: u32,
        height: u32,
        order: ChannelOrder,
        alpha_mode: AlphaMode,
        data: Vec<u8>,
    ) -> Self {
        let expected = Self::byte_len(width, height);
        assert_eq!(
            data.len(),
            expected,
            "pixel buffer of {}x{} needs {} bytes",
            width,
            height,
            expected
        );

        Self {
            width,
            height,
            order,
            alpha_mode,
            data,
        }
    }

    /// Byte length required for a `width` x `height` buffer
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Take ownership of a decoded straight-alpha RGBA image
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(
            width,
            height,
            ChannelOrder::Rgba,
            AlphaMode::Straight,
            image.into_raw(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Iterate pixels in row-major order, 4 bytes each
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(BYTES_PER_PIXEL)
    }

    /// Same pixels laid out in another channel order
    pub fn reordered(&self, order: ChannelOrder) -> PixelBuffer {
        if order == self.order {
            return self.clone();
        }

        let data = self
            .pixels()
            .flat_map(|pixel| {
                let [r, g, b, a] = self.order.unpack(pixel);
                order.pack(r, g, b, a)
            })
            .collect();

        PixelBuffer::new(self.width, self.height, order, self.alpha_mode, data)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("order", &self.order)
            .field("alpha_mode", &self.alpha_mode)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Flat `f32` values with a shape, stored row-major
///
/// Network input is `[1, 3, H, W]`, every network output is `[1, 1, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// Take an ndarray of any dimensionality
    pub fn from_array<D: Dimension>(array: Array<f32, D>) -> Self {
        let data = if array.is_standard_layout() {
            array.into_dyn()
        } else {
            array.as_standard_layout().into_owned().into_dyn()
        };
        Self { data }
    }

    /// Build from a shape and row-major values
    ///
    /// Fails when `values.len()` is not the product of `shape`.
    pub fn from_shape_vec(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        let actual = values.len();
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(|data| Self { data })
            .map_err(|_| Error::ShapeMismatch {
                expected: format!(
                    "{} values for shape {:?}",
                    shape.iter().product::<usize>(),
                    shape
                ),
                actual: format!("{actual} values"),
            })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values in row-major (plane-major for NCHW) order
    pub fn as_slice(&self) -> &[f32] {
        self.data
            .as_slice()
            .expect("tensor storage is kept in standard layout")
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    /// Element-wise transform into a tensor of the same shape
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Tensor {
        Self {
            data: self.data.mapv(f),
        }
    }

    /// `(height, width)` of a single-channel `[1, 1, H, W]` map
    ///
    /// # Panics
    /// If the tensor has any other shape.
    pub fn mask_dims(&self) -> (usize, usize) {
        match self.shape() {
            &[1, 1, height, width] => (height, width),
            other => panic!("expected a [1, 1, H, W] mask tensor, got {:?}", other),
        }
    }
}

/// Output names of the U²-Net export, finest (fused) mask first
pub const OUTPUT_NAMES: [&str; 7] = ["o0", "o1", "o2", "o3", "o4", "o5", "o6"];

/// Every decoder-stage output of one inference call
#[derive(Debug, Clone)]
pub struct SegmentationOutputs {
    stages: [Tensor; 7],
}

impl SegmentationOutputs {
    /// `stages[i]` is the tensor named `OUTPUT_NAMES[i]`
    pub fn new(stages: [Tensor; 7]) -> Self {
        Self { stages }
    }

    /// The fused full-resolution mask (`o0`)
    pub fn fused(&self) -> &Tensor {
        &self.stages[0]
    }

    /// Intermediate stage masks in display order, `o6` down to `o1`
    pub fn side_outputs(&self) -> impl Iterator<Item = (&'static str, &Tensor)> {
        OUTPUT_NAMES
            .iter()
            .zip(self.stages.iter())
            .skip(1)
            .rev()
            .map(|(name, tensor)| (*name, tensor))
    }
}

/// Trait for segmentation models
/// Allows swapping the ONNX-backed network for other engines (or a fake in tests)
pub trait SegmentationModel {
    /// Run the network once on a `[1, 3, H, W]` input tensor
    ///
    /// # Returns
    /// * All seven stage outputs, each `[1, 1, H, W]` with values nominally in 0.0-1.0
    fn infer(&mut self, input: &Tensor) -> Result<SegmentationOutputs>;

    /// Get the model's fixed input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);

    /// Get the output dimensions (usually matches input)
    ///
    /// Returns (width, height)
    fn output_size(&self) -> (u32, u32) {
        self.input_size()
    }
}
