//! Two-stage inference pipeline.
//!
//! `submit(image)` walks the state machine
//! `Idle -> Preprocessing -> GateChecking -> {Classifying | Rejected} -> Done`:
//!
//! 1. the image is display-resized for the caller's preview
//! 2. the gate is asked about the submitted image (it encodes its own
//!    300 px payload); any gate failure counts as "no"
//! 3. only on "yes", the *original* image is normalized and classified on a
//!    blocking worker
//!
//! Every failure is converted to one of the fixed [`PipelineResult`] labels;
//! nothing is retried and no error crosses this boundary.
//!
//! Submissions are serialized: a second `submit` waits until the first run
//! reaches `Done`. A run executes on its own task holding the run lock, so
//! dropping the `submit` future abandons only the result, never the run.
//! Stage transitions are published on a `watch` channel.

mod builder;

use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::Result;
use crate::model::{LeafClassifier, ModelStatus};
use crate::preprocess::{resize_for_display, resize_for_model};
use crate::providers::LeafDetector;
use crate::telemetry;
use crate::types::{ClassificationScore, PipelineOutcome, PipelineResult, PipelineStage};

pub use builder::PipelineBuilder;

/// Leaf gate + health classifier, run in strict sequence.
///
/// Cheap to clone; clones share the model, the run lock and the stage channel.
#[derive(Clone)]
pub struct InferencePipeline {
    inner: Arc<Stages>,
}

struct Stages {
    gate: Arc<dyn LeafDetector>,
    classifier: Arc<LeafClassifier>,
    display_max_dimension: u32,
    run_lock: Arc<Mutex<()>>,
    stage: watch::Sender<PipelineStage>,
}

impl InferencePipeline {
    /// Create a new builder for configuring the pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub(crate) fn new(
        gate: Arc<dyn LeafDetector>,
        classifier: Arc<LeafClassifier>,
        display_max_dimension: u32,
    ) -> Self {
        let (stage, _) = watch::channel(PipelineStage::Idle);
        Self {
            inner: Arc::new(Stages {
                gate,
                classifier,
                display_max_dimension,
                run_lock: Arc::new(Mutex::new(())),
                stage,
            }),
        }
    }

    /// Classify one image and return the terminal label.
    ///
    /// `None` stands for an absent image and yields "Error: Image not found".
    pub async fn submit(&self, image: Option<DynamicImage>) -> PipelineResult {
        self.run(image).await.result
    }

    /// Like [`submit`](Self::submit), also returning the display-resized preview.
    ///
    /// Once the run lock is acquired the run proceeds to `Done` even if this
    /// future is dropped.
    pub async fn run(&self, image: Option<DynamicImage>) -> PipelineOutcome {
        let guard = Arc::clone(&self.inner.run_lock).lock_owned().await;
        let handle = self.spawn_locked(guard, image);
        self.join(handle).await
    }

    /// Run on the tokio runtime so the calling thread is not blocked.
    ///
    /// The run cannot be cancelled; drop the handle to ignore a stale result.
    pub fn spawn_submit(&self, image: Option<DynamicImage>) -> JoinHandle<PipelineOutcome> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(image).await })
    }

    /// Subscribe to stage transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineStage> {
        self.inner.stage.subscribe()
    }

    /// Most recent stage.
    pub fn stage(&self) -> PipelineStage {
        *self.inner.stage.borrow()
    }

    /// Load state of the classifier model.
    pub fn model_status(&self) -> ModelStatus {
        self.inner.classifier.status()
    }

    /// Release the classifier model. Waits for an in-flight run to finish.
    ///
    /// Returns `true` if this call released the model.
    pub async fn shutdown(&self) -> bool {
        let _guard = self.inner.run_lock.lock().await;
        self.inner.classifier.release()
    }

    fn spawn_locked(
        &self,
        guard: OwnedMutexGuard<()>,
        image: Option<DynamicImage>,
    ) -> JoinHandle<PipelineOutcome> {
        let stages = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = guard;
            let worker = Arc::clone(&stages);
            let outcome = match tokio::spawn(async move { worker.run_stages(image).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "pipeline run aborted");
                    PipelineOutcome {
                        result: PipelineResult::PredictionError,
                        preview: None,
                    }
                }
            };
            stages.finish(&outcome);
            outcome
        })
    }

    async fn join(&self, handle: JoinHandle<PipelineOutcome>) -> PipelineOutcome {
        handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "pipeline task failed");
            PipelineOutcome {
                result: PipelineResult::PredictionError,
                preview: None,
            }
        })
    }
}

impl Stages {
    fn finish(&self, outcome: &PipelineOutcome) {
        self.set_stage(PipelineStage::Done(outcome.result));

        metrics::counter!(telemetry::PIPELINE_RESULTS_TOTAL,
            "result" => outcome.result.as_str(),
        )
        .increment(1);
        info!(result = %outcome.result, "pipeline run finished");
    }

    async fn run_stages(&self, image: Option<DynamicImage>) -> PipelineOutcome {
        self.set_stage(PipelineStage::Preprocessing);

        let Some(image) = image else {
            debug!("no image submitted");
            return PipelineOutcome {
                result: PipelineResult::ImageNotFound,
                preview: None,
            };
        };

        let display = match resize_for_display(&image, self.display_max_dimension) {
            Ok(display) => display,
            Err(e) => {
                warn!(error = %e, "rejecting submitted image");
                return PipelineOutcome {
                    result: PipelineResult::ImageNotFound,
                    preview: None,
                };
            }
        };

        self.set_stage(PipelineStage::GateChecking);
        if !self.gate.is_leaf(&image).await {
            self.set_stage(PipelineStage::Rejected);
            return PipelineOutcome {
                result: PipelineResult::LeafMissing,
                preview: Some(display),
            };
        }

        self.set_stage(PipelineStage::Classifying);
        let result = self.classify(image).await;

        PipelineOutcome {
            result,
            preview: Some(display),
        }
    }

    /// Normalize and classify on a blocking worker. Errors and worker
    /// panics both map to "Error in Prediction".
    async fn classify(&self, image: DynamicImage) -> PipelineResult {
        let classifier = Arc::clone(&self.classifier);
        let task = tokio::task::spawn_blocking(move || -> Result<ClassificationScore> {
            let tensor = resize_for_model(&image)?;
            classifier.classify(&tensor)
        });

        match task.await {
            Ok(Ok(score)) => {
                debug!(score = score.value(), "classified leaf");
                score.label().into()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "classification failed");
                PipelineResult::PredictionError
            }
            Err(e) => {
                warn!(error = %e, "classification worker aborted");
                PipelineResult::PredictionError
            }
        }
    }

    fn set_stage(&self, stage: PipelineStage) {
        debug!(?stage, "pipeline stage");
        self.stage.send_replace(stage);
    }
}
