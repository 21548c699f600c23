//! # cutout
//!
//! Background removal with the U²-Net salient object segmentation network.
//!
//! The interesting work happens on either side of inference: pixel buffers
//! are transposed into the normalized, plane-permuted tensor the network
//! expects, and the network's probability maps are turned back into
//! grayscale previews and a premultiplied-alpha cutout of the source.
//!
//! ## Example
//!
//! ```no_run
//! use cutout::output::PngSink;
//! use cutout::segmentation::create_default_model;
//! use cutout::source::FileSource;
//! use cutout::{Pipeline, PipelineConfig};
//!
//! # fn main() -> cutout::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let mut model = create_default_model("assets/u2net.onnx", 4)?;
//! let source = FileSource::open("portrait.jpg")?;
//!
//! let outputs = pipeline.run(&source, model.as_mut())?;
//! outputs.write_to(&mut PngSink::new("out")?)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod output;
pub mod pipeline;
pub mod segmentation;
pub mod source;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutputs};
