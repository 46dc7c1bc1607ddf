//! Pipeline state machine types.

use image::DynamicImage;

use super::PipelineResult;

/// Stage of the inference pipeline.
///
/// `Idle -> Preprocessing -> GateChecking -> {Classifying | Rejected} -> Done`.
/// Failures jump straight to `Done` with an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// No image submitted yet.
    Idle,
    Preprocessing,
    GateChecking,
    Classifying,
    /// Gate said "not a leaf"; the classifier will not run.
    Rejected,
    Done(PipelineResult),
}

impl PipelineStage {
    /// Whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle | Self::Done(_))
    }

    /// Terminal result, once the run is done.
    pub fn result(&self) -> Option<PipelineResult> {
        match self {
            Self::Done(result) => Some(*result),
            _ => None,
        }
    }
}

/// Result of one run plus the display-resized copy of the submitted image.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub result: PipelineResult,
    /// `None` when the image was absent or degenerate.
    pub preview: Option<DynamicImage>,
}
