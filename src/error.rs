//! Error types for the cutout library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the cutout library.
///
/// Contract violations inside the transcoding core (mismatched buffer and
/// tensor sizes) are programming errors and panic instead of landing here.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or decode an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to encode or write an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Failed to load the ONNX model (missing asset, unreadable graph).
    #[error("failed to load ONNX model from {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed at runtime.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// The model did not produce an expected named output.
    #[error("model output {name} is missing")]
    MissingOutput { name: String },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the segmentation network could not deliver
    /// its outputs, as opposed to an image or filesystem problem.
    pub fn is_inference_unavailable(&self) -> bool {
        matches!(
            self,
            Error::ModelLoad { .. }
                | Error::Inference { .. }
                | Error::MissingOutput { .. }
                | Error::ShapeMismatch { .. }
        )
    }
}

/// Result type alias for cutout operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_unavailable_family() {
        let missing = Error::MissingOutput {
            name: "o3".to_string(),
        };
        assert!(missing.is_inference_unavailable());

        let shape = Error::ShapeMismatch {
            expected: "[1, 1, 320, 320]".to_string(),
            actual: "[1, 1, 160, 160]".to_string(),
        };
        assert!(shape.is_inference_unavailable());

        let param = Error::InvalidParameter {
            name: "cutoff".to_string(),
            reason: "out of range".to_string(),
        };
        assert!(!param.is_inference_unavailable());
    }

    #[test]
    fn test_display_mentions_output_name() {
        let missing = Error::MissingOutput {
            name: "o6".to_string(),
        };
        assert_eq!(missing.to_string(), "model output o6 is missing");
    }
}
