mod composite;
mod numeric;
mod postprocess;
mod preprocess;
pub mod types;
mod u2net;

pub use composite::MaskCompositor;
pub use numeric::{clamp_unit, round_to_byte, unit_to_byte, NormalizationParams};
pub use postprocess::TensorDecoder;
pub use preprocess::{PlaneMapping, TensorEncoder, INPUT_PLANES};
pub use types::{
    AlphaMode, Channel, ChannelOrder, PixelBuffer, SegmentationModel, SegmentationOutputs, Tensor,
    OUTPUT_NAMES,
};
pub use u2net::{U2Net, INPUT_NAME, MODEL_SIZE};

use crate::error::Result;
use std::path::Path;

/// Create the default segmentation model (U²-Net)
pub fn create_default_model<P: AsRef<Path>>(
    model_path: P,
    intra_threads: usize,
) -> Result<Box<dyn SegmentationModel>> {
    let model = U2Net::new(model_path, intra_threads)?;
    Ok(Box::new(model))
}
