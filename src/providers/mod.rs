//! Backends for the two inference stages.
//!
//! The remote leaf gate is a Gemini client; the local health model runs
//! on ONNX Runtime when the `onnx` feature is enabled.

pub mod gemini;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod traits;

pub use gemini::GeminiLeafGate;
#[cfg(feature = "onnx")]
pub use onnx::OnnxScoreModel;
pub use traits::{LeafDetector, ScoreModel};
