//! Leafcheck - two-stage leaf health classification
//!
//! A submitted image first goes through a remote gate that answers
//! "does this image contain a leaf?". Only on a positive answer is the
//! image normalized and scored by a local binary classifier, producing
//! "Healthy" or "Unhealthy". Every run ends in one of a fixed set of
//! labels; failures never escape the pipeline.
//!
//! # Example (requires `onnx` feature)
//!
//! ```rust,ignore
//! use leafcheck::{Device, GeminiLeafGate, InferencePipeline, LeafClassifier};
//!
//! #[tokio::main]
//! async fn main() -> leafcheck::Result<()> {
//!     let pipeline = InferencePipeline::builder()
//!         .gate(GeminiLeafGate::new("your-gemini-key")?)
//!         .classifier(LeafClassifier::load_onnx("model.onnx", Device::Cpu))
//!         .build()?;
//!
//!     let image = image::open("leaf.jpg").ok();
//!     let result = pipeline.submit(image).await;
//!     println!("{result}");
//!
//!     pipeline.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod providers;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use error::{LeafError, Result};
pub use model::{Device, LeafClassifier, ModelStatus};
pub use pipeline::{InferencePipeline, PipelineBuilder};
pub use providers::{GeminiLeafGate, LeafDetector, ScoreModel};
pub use version::{BuildInfo, PKG_VERSION, version_string};

#[cfg(feature = "onnx")]
pub use providers::OnnxScoreModel;

// Re-export all types
pub use types::{
    ClassificationScore, EncodedImage, HealthLabel, NormalizedTensor, PipelineOutcome,
    PipelineResult, PipelineStage,
};
