//! Telemetry metric name constants.
//!
//! Centralised metric names for leafcheck operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `leafcheck_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `status`: outcome: "ok" or "error"
//! - `verdict`: gate decision: "leaf" or "not_leaf"
//! - `result`: terminal pipeline label (e.g. "Healthy", "Leaf missing")

/// Total gate calls issued.
///
/// Labels: `status` ("ok" | "error"), `verdict` ("leaf" | "not_leaf").
/// Errors always carry `verdict = "not_leaf"` (the gate fails closed).
pub const GATE_REQUESTS_TOTAL: &str = "leafcheck_gate_requests_total";

/// Gate round-trip duration in seconds, including payload encoding.
pub const GATE_DURATION_SECONDS: &str = "leafcheck_gate_duration_seconds";

/// Local model invocation duration in seconds.
///
/// Covers the model call only; resizing and normalization happen before it.
pub const CLASSIFY_DURATION_SECONDS: &str = "leafcheck_classify_duration_seconds";

/// Total terminal pipeline results.
///
/// Labels: `result`.
pub const PIPELINE_RESULTS_TOTAL: &str = "leafcheck_pipeline_results_total";
