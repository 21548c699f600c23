use super::types::{SegmentationModel, SegmentationOutputs, Tensor, OUTPUT_NAMES};
use crate::error::{Error, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;

/// Name of the model's single input
pub const INPUT_NAME: &str = "input";

/// Fixed square resolution of the U²-Net export
pub const MODEL_SIZE: u32 = 320;

/// U²-Net salient object segmentation model
///
/// Stateless: one input tensor in, seven stage masks out. `o0` is the fused
/// mask, `o1`..`o6` are the side outputs of the decoder stages.
pub struct U2Net {
    session: Session,
    width: u32,
    height: u32,
}

impl U2Net {
    /// Create a new U²-Net model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `intra_threads` - Worker threads ONNX Runtime may use per operator
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading U²-Net model from {}", path.display());

        let session = build_session(path, intra_threads).map_err(|source| Error::ModelLoad {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("U²-Net model loaded successfully");
        tracing::debug!(
            "Model inputs: {:?}, outputs: {:?}",
            session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            session.outputs.iter().map(|o| o.name.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            session,
            width: MODEL_SIZE,
            height: MODEL_SIZE,
        })
    }

    fn expected_output_shape(&self) -> [usize; 4] {
        [1, 1, self.height as usize, self.width as usize]
    }
}

fn build_session(path: &Path, intra_threads: usize) -> ort::Result<Session> {
    let builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?;

    #[cfg(feature = "cuda")]
    let builder = builder.with_execution_providers([
        ort::execution_providers::CUDAExecutionProvider::default().build(),
    ])?;

    #[cfg(feature = "tensorrt")]
    let builder = builder.with_execution_providers([
        ort::execution_providers::TensorRTExecutionProvider::default().build(),
    ])?;

    builder.commit_from_file(path)
}

/// Check one named output against the expected `[1, 1, H, W]` shape
///
/// `extracted` is the output's raw shape and data, or `None` when the model
/// produced no output of that name. Dynamic (negative) dimensions are
/// rejected like any other mismatch.
fn stage_tensor(
    name: &str,
    extracted: Option<(&[i64], &[f32])>,
    expected: [usize; 4],
) -> Result<Tensor> {
    let (shape, data) = extracted.ok_or_else(|| Error::MissingOutput {
        name: name.to_string(),
    })?;

    let matches = shape.len() == expected.len()
        && shape
            .iter()
            .zip(expected.iter())
            .all(|(&actual, &wanted)| usize::try_from(actual) == Ok(wanted));
    if !matches {
        return Err(Error::ShapeMismatch {
            expected: format!("{name} {:?}", expected),
            actual: format!("{:?}", shape),
        });
    }

    Tensor::from_shape_vec(&expected, data.to_vec())
}

impl SegmentationModel for U2Net {
    fn infer(&mut self, input: &Tensor) -> Result<SegmentationOutputs> {
        let _span = tracing::debug_span!("u2net_infer").entered();

        let expected_input = [1, 3, self.height as usize, self.width as usize];
        if input.shape() != expected_input {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", expected_input),
                actual: format!("{:?}", input.shape()),
            });
        }

        let input_value = ort::value::Tensor::from_array((expected_input, input.as_slice().to_vec()))
            .map_err(|source| Error::Inference { source })?;
        let expected_output = self.expected_output_shape();

        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input_value])
            .map_err(|source| Error::Inference { source })?;

        let mut stages = Vec::with_capacity(OUTPUT_NAMES.len());

        for name in OUTPUT_NAMES {
            let extracted = match outputs.get(name) {
                Some(value) => Some(
                    value
                        .try_extract_tensor::<f32>()
                        .map_err(|source| Error::Inference { source })?,
                ),
                None => None,
            };

            stages.push(stage_tensor(
                name,
                extracted.map(|(shape, data)| (&shape[..], data)),
                expected_output,
            )?);
        }

        let stages: [Tensor; 7] = stages.try_into().map_err(|_| Error::MissingOutput {
            name: OUTPUT_NAMES.join(","),
        })?;

        Ok(SegmentationOutputs::new(stages))
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: [usize; 4] = [1, 1, MODEL_SIZE as usize, MODEL_SIZE as usize];

    #[test]
    fn test_full_resolution_output_is_accepted() {
        let data = vec![0.25f32; (MODEL_SIZE * MODEL_SIZE) as usize];
        let tensor = stage_tensor("o0", Some((&[1i64, 1, 320, 320][..], &data[..])), EXPECTED).unwrap();

        assert_eq!(tensor.shape(), &EXPECTED);
        assert_eq!(tensor.mask_dims(), (320, 320));
        assert_eq!(tensor.as_slice()[0], 0.25);
    }

    #[test]
    fn test_smaller_output_is_rejected() {
        let data = vec![0.0f32; 160 * 160];
        let err = stage_tensor("o3", Some((&[1i64, 1, 160, 160][..], &data[..])), EXPECTED).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(err.is_inference_unavailable());
    }

    #[test]
    fn test_dynamic_dimension_is_rejected() {
        let data = vec![0.0f32; 320];
        let err = stage_tensor("o1", Some((&[1i64, 1, -1, 320][..], &data[..])), EXPECTED).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(err.is_inference_unavailable());
    }

    #[test]
    fn test_wrong_rank_is_rejected() {
        let data = vec![0.0f32; 320 * 320];
        let err = stage_tensor("o2", Some((&[1i64, 320, 320][..], &data[..])), EXPECTED).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_short_data_is_rejected() {
        let data = vec![0.0f32; 10];
        let err = stage_tensor("o4", Some((&[1i64, 1, 320, 320][..], &data[..])), EXPECTED).unwrap_err();

        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(err.is_inference_unavailable());
    }

    #[test]
    fn test_absent_output_is_missing() {
        let err = stage_tensor("o6", None, EXPECTED).unwrap_err();

        assert!(matches!(err, Error::MissingOutput { ref name } if name == "o6"));
        assert!(err.is_inference_unavailable());
    }
}
