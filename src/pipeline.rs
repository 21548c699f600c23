//! Sequences decode, encode, inference, and the two decoding paths.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::output::OutputSink;
use crate::segmentation::{
    ChannelOrder, MaskCompositor, PixelBuffer, PlaneMapping, SegmentationModel, TensorDecoder,
    TensorEncoder,
};
use crate::source::ImageSource;

/// Configuration for the background removal pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Channel order of the buffer fed to the encoder and the compositor.
    pub input_order: ChannelOrder,

    /// Channel order of every buffer handed to the sink.
    pub display_order: ChannelOrder,

    /// Tensor plane layout and normalization expected by the network.
    pub mapping: PlaneMapping,

    /// Probability at or below which a pixel is treated as background (0.0-1.0).
    pub cutoff: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_order: ChannelOrder::Rgba,
            display_order: ChannelOrder::Bgra,
            mapping: PlaneMapping::U2NET_BRG,
            cutoff: 0.0,
        }
    }
}

/// Everything one run produces, ready for display.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    /// Source image at model resolution.
    pub source: PixelBuffer,

    /// Grayscale side outputs, `o6` down to `o1`.
    pub stages: Vec<(&'static str, PixelBuffer)>,

    /// Source with the background removed, premultiplied alpha.
    pub composite: PixelBuffer,

    /// Wall-clock time spent inside the inference call.
    pub inference_time: Duration,
}

impl PipelineOutputs {
    /// Frames in display order: source, o6..o1, composite.
    pub fn frames(&self) -> impl Iterator<Item = (&str, &PixelBuffer)> {
        std::iter::once(("source", &self.source))
            .chain(self.stages.iter().map(|(name, frame)| (*name, frame)))
            .chain(std::iter::once(("composite", &self.composite)))
    }

    /// Hand every frame to `sink`, in display order.
    pub fn write_to<O: OutputSink + ?Sized>(&self, sink: &mut O) -> Result<()> {
        for (name, frame) in self.frames() {
            sink.write_frame(name, frame)?;
        }
        Ok(())
    }
}

/// Background removal pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    encoder: TensorEncoder,
    compositor: MaskCompositor,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cutoff is outside [0, 1].
    pub fn new(config: PipelineConfig) -> Result<Self> {
        tracing::debug!("Initializing pipeline with config: {config:?}");

        let encoder = TensorEncoder::new(config.mapping);
        let compositor = MaskCompositor::new(config.cutoff, config.display_order)?;

        Ok(Self {
            config,
            encoder,
            compositor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one image through the model.
    ///
    /// Nothing is returned unless inference succeeded, so a caller never
    /// shows partial results.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be decoded or the model fails.
    pub fn run<S, M>(&self, source: &S, model: &mut M) -> Result<PipelineOutputs>
    where
        S: ImageSource + ?Sized,
        M: SegmentationModel + ?Sized,
    {
        let _span = tracing::debug_span!("pipeline").entered();

        let (width, height) = model.input_size();
        if model.output_size() != (width, height) {
            let (out_width, out_height) = model.output_size();
            return Err(Error::ShapeMismatch {
                expected: format!("output size {width}x{height}"),
                actual: format!("{out_width}x{out_height}"),
            });
        }

        // Same image twice: one layout for the network, one for display
        let input = source.decode(width, height, self.config.input_order)?;
        let display = source.decode(width, height, self.config.display_order)?;

        let tensor = self.encoder.encode(&input);

        let infer_start = Instant::now();
        let outputs = model.infer(&tensor)?;
        let inference_time = infer_start.elapsed();
        tracing::info!(
            "Inference took {:.1}ms",
            inference_time.as_secs_f64() * 1000.0
        );

        let stages = outputs
            .side_outputs()
            .map(|(name, mask)| {
                (
                    name,
                    TensorDecoder::to_grayscale(mask, self.config.display_order),
                )
            })
            .collect();

        let composite = self.compositor.composite(&input, outputs.fused());

        Ok(PipelineOutputs {
            source: display,
            stages,
            composite,
            inference_time,
        })
    }
}
