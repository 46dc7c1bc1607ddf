//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use leafcheck::telemetry;
use leafcheck::{
    InferencePipeline, LeafClassifier, LeafDetector, LeafError, NormalizedTensor, PipelineResult,
    Result, ScoreModel,
};

// ============================================================================
// Mock stages
// ============================================================================

struct FixedGate(bool);

#[async_trait]
impl LeafDetector for FixedGate {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn check(&self, _image: &DynamicImage) -> Result<bool> {
        Ok(self.0)
    }
}

struct BrokenGate;

#[async_trait]
impl LeafDetector for BrokenGate {
    fn name(&self) -> &str {
        "broken"
    }

    async fn check(&self, _image: &DynamicImage) -> Result<bool> {
        Err(LeafError::Api {
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}

struct Constant(f32);

impl ScoreModel for Constant {
    fn name(&self) -> &str {
        "constant"
    }

    fn score(&self, _tensor: &NormalizedTensor) -> Result<f32> {
        Ok(self.0)
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum counter values matching a metric name and one label pair.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: (&str, &str)) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| {
            key.key()
                .labels()
                .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn photo() -> Option<DynamicImage> {
    Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        400,
        400,
        Rgb([20, 120, 40]),
    )))
}

/// Runs a pipeline future within a local recorder scope.
///
/// Each run executes on its own spawned task; a current-thread runtime
/// keeps those tasks on the thread that owns the local recorder.
fn record<F: std::future::Future>(recorder: &DebuggingRecorder, future: F) -> F::Output {
    metrics::with_local_recorder(recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    })
}

fn pipeline(gate: impl LeafDetector + 'static) -> InferencePipeline {
    InferencePipeline::builder()
        .gate(gate)
        .classifier(LeafClassifier::new(Constant(0.9)))
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn rejected_leaf_records_gate_and_result_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = record(&recorder, async { pipeline(FixedGate(false)).submit(photo()).await });
    assert_eq!(result, PipelineResult::LeafMissing);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::GATE_REQUESTS_TOTAL, ("verdict", "not_leaf")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::GATE_REQUESTS_TOTAL, ("status", "ok")),
        1
    );
    assert!(has_histogram(&snapshot, telemetry::GATE_DURATION_SECONDS));
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::PIPELINE_RESULTS_TOTAL,
            ("result", "Leaf missing")
        ),
        1
    );
}

#[test]
fn gate_error_records_error_status() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = record(&recorder, async { pipeline(BrokenGate).submit(photo()).await });
    assert_eq!(result, PipelineResult::LeafMissing);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::GATE_REQUESTS_TOTAL, ("status", "error")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::GATE_REQUESTS_TOTAL, ("verdict", "leaf")),
        0
    );
}

#[test]
fn absent_image_records_result_without_gate_call() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    record(&recorder, async { pipeline(FixedGate(true)).submit(None).await });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::PIPELINE_RESULTS_TOTAL,
            ("result", "Error: Image not found")
        ),
        1
    );
    assert!(!has_histogram(&snapshot, telemetry::GATE_DURATION_SECONDS));
}

#[test]
fn classify_records_duration() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let classifier = LeafClassifier::new(Constant(0.4));
    let tensor = NormalizedTensor::from_vec(vec![0.5; NormalizedTensor::LEN]).unwrap();
    metrics::with_local_recorder(&recorder, || classifier.classify(&tensor).unwrap());

    let snapshot = snapshotter.snapshot().into_vec();
    assert!(has_histogram(&snapshot, telemetry::CLASSIFY_DURATION_SECONDS));
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    assert_eq!(
        pipeline(FixedGate(true)).submit(photo()).await,
        PipelineResult::Healthy
    );
}
