//! Shared float <-> byte conversions
//!
//! Every float-to-byte conversion in the crate goes through `round_to_byte`,
//! so encoder, decoder and compositor agree on one rounding rule:
//! round half to even, then saturate into 0..=255.

/// Per-plane normalization: `x = (b / 255 - mean) / std_dev`
///
/// Evaluated in `f64` and narrowed once, so the tensor matches a
/// double-precision reference bit for bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationParams {
    pub mean: f64,
    pub std_dev: f64,
}

impl NormalizationParams {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Map a byte intensity to a normalized network input value
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn normalize(&self, byte: u8) -> f32 {
        ((f64::from(byte) / 255.0 - self.mean) / self.std_dev) as f32
    }

    /// Inverse of `normalize`, rounded back to a byte
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn denormalize(&self, value: f32) -> u8 {
        round_to_byte(((f64::from(value) * self.std_dev + self.mean) * 255.0) as f32)
    }
}

/// Clamp a probability into [0, 1]
///
/// NaN maps to 0.
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Round half to even and saturate into a byte
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_to_byte(value: f32) -> u8 {
    // Float-to-int `as` saturates, NaN becomes 0
    value.round_ties_even() as u8
}

/// Probability in [0, 1] (clamped first) to an intensity byte
#[inline]
pub fn unit_to_byte(value: f32) -> u8 {
    round_to_byte(clamp_unit(value) * 255.0)
}
