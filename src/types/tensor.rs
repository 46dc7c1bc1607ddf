//! Classifier input tensor and gate payload types.

use crate::{LeafError, Result};

/// Side length of the square classifier input, in pixels.
pub const MODEL_INPUT_SIZE: usize = 150;

/// Number of colour channels in the classifier input (R, G, B).
pub const MODEL_CHANNELS: usize = 3;

/// Fixed classifier input: shape `(1, 150, 150, 3)`, `f32`, each value in `[0.0, 1.0]`.
///
/// Layout is row-major HWC: pixels are stored row by row (x varies fastest),
/// each pixel as consecutive R, G, B values. The only way to build one is
/// from exactly `150 * 150 * 3` values in range, so shape and range hold
/// for every instance.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
}

impl NormalizedTensor {
    /// Tensor shape as fed to the model.
    pub const SHAPE: [usize; 4] = [1, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, MODEL_CHANNELS];

    /// Number of `f32` elements.
    pub const LEN: usize = MODEL_INPUT_SIZE * MODEL_INPUT_SIZE * MODEL_CHANNELS;

    /// Wrap raw values, validating length and range.
    pub fn from_vec(data: Vec<f32>) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(LeafError::Classification(format!(
                "expected {} tensor elements, got {}",
                Self::LEN,
                data.len()
            )));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(LeafError::Classification(format!(
                "tensor value {bad} outside [0, 1]"
            )));
        }
        Ok(Self { data })
    }

    /// Build from 8-bit RGB bytes of a 150×150 image, dividing each channel by 255.
    pub(crate) fn from_rgb_bytes(rgb: &[u8]) -> Result<Self> {
        if rgb.len() != Self::LEN {
            return Err(LeafError::Classification(format!(
                "expected {} RGB bytes, got {}",
                Self::LEN,
                rgb.len()
            )));
        }
        Ok(Self {
            data: rgb.iter().map(|&b| f32::from(b) / 255.0).collect(),
        })
    }

    /// Tensor shape `(1, 150, 150, 3)`.
    pub fn shape(&self) -> [usize; 4] {
        Self::SHAPE
    }

    /// Flat view of the values in layout order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at row `y`, column `x`, channel `c` (0 = R, 1 = G, 2 = B).
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        if y >= MODEL_INPUT_SIZE || x >= MODEL_INPUT_SIZE || c >= MODEL_CHANNELS {
            return None;
        }
        self.data
            .get((y * MODEL_INPUT_SIZE + x) * MODEL_CHANNELS + c)
            .copied()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// JPEG bytes of the display-sized image, base64 encoded without line
/// wrapping. Only ever sent to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub data: String,
}
