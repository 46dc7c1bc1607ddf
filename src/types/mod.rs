//! Public types for the Leafcheck API.

mod label;
mod stage;
mod tensor;

pub use label::{ClassificationScore, HEALTHY_THRESHOLD, HealthLabel, PipelineResult};
pub use stage::{PipelineOutcome, PipelineStage};
pub use tensor::{EncodedImage, MODEL_CHANNELS, MODEL_INPUT_SIZE, NormalizedTensor};
