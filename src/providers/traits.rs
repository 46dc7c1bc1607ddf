//! Provider traits for the two inference stages.
//!
//! The pipeline depends on these seams rather than on concrete backends:
//! - [`LeafDetector`] answers "is this a leaf?" (remote, async)
//! - [`ScoreModel`] turns a normalized tensor into a health score (local, blocking)
//!
//! # Fail-closed gate
//!
//! Detectors report failures through [`LeafDetector::check`]. The pipeline
//! only ever calls [`LeafDetector::is_leaf`], whose default implementation
//! turns every error into `false`:
//!
//! ```ignore
//! match detector.check(&image).await {
//!     Ok(verdict) => verdict,
//!     Err(_) => false, // transport, status, parse: all "not a leaf"
//! }
//! ```

use std::time::Instant;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::warn;

use crate::Result;
use crate::telemetry;
use crate::types::NormalizedTensor;

// ============================================================================
// Leaf Detector
// ============================================================================

/// Gate deciding whether an image depicts a leaf.
#[async_trait]
pub trait LeafDetector: Send + Sync {
    /// Detector name for logging/debugging.
    fn name(&self) -> &str;

    /// Ask the detector, surfacing failures.
    async fn check(&self, image: &DynamicImage) -> Result<bool>;

    /// Fail-closed verdict: `true` only for a successful, positive answer.
    ///
    /// Records gate metrics. Default implementation wraps [`check`](Self::check).
    async fn is_leaf(&self, image: &DynamicImage) -> bool {
        let start = Instant::now();
        let outcome = self.check(image).await;

        let (status, verdict) = match &outcome {
            Ok(true) => ("ok", true),
            Ok(false) => ("ok", false),
            Err(e) => {
                warn!(detector = self.name(), error = %e, "gate failed, treating as not a leaf");
                ("error", false)
            }
        };

        metrics::counter!(telemetry::GATE_REQUESTS_TOTAL,
            "status" => status,
            "verdict" => if verdict { "leaf" } else { "not_leaf" },
        )
        .increment(1);
        metrics::histogram!(telemetry::GATE_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());

        verdict
    }
}

// ============================================================================
// Score Model
// ============================================================================

/// Local fixed-topology model: `(1, 150, 150, 3)` f32 in, `(1, 1)` f32 out.
///
/// Implementations are loaded once and never mutated by scoring; callers
/// share one instance across runs.
pub trait ScoreModel: Send + Sync {
    /// Model name for logging/debugging.
    fn name(&self) -> &str;

    /// Run the model and return its single raw output value.
    fn score(&self, tensor: &NormalizedTensor) -> Result<f32>;
}
