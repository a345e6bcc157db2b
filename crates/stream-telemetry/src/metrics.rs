//! Prometheus metrics for stream admission.
//!
//! All metrics follow the naming convention: `sa_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., admissions_total)
//! - **Gauge**: Value that can go up or down (e.g., inflight_bytes)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Candidates admitted for proposal, per stream
    pub static ref ADMISSIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("sa_admission_admitted_total", "Candidate messages admitted for proposal"),
        &["stream"]
    ).expect("metric creation failed");

    /// Rejections by stream and error kind
    pub static ref REJECTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("sa_admission_rejected_total", "Candidate messages rejected before proposal"),
        &["stream", "kind"]
    ).expect("metric creation failed");

    /// Estimated bytes of admitted but not yet appended proposals
    pub static ref INFLIGHT_BYTES: GaugeVec = GaugeVec::new(
        Opts::new("sa_quota_inflight_bytes", "Estimated stored bytes of inflight proposals"),
        &["stream"]
    ).expect("metric creation failed");

    /// Counter subjects with an in-memory running total
    pub static ref COUNTER_SUBJECTS: GaugeVec = GaugeVec::new(
        Opts::new("sa_counter_tracked_subjects", "Counter subjects with inflight increments"),
        &["stream"]
    ).expect("metric creation failed");

    /// Subjects holding an outstanding last-sequence assertion
    pub static ref SUBJECTS_IN_PROCESS: GaugeVec = GaugeVec::new(
        Opts::new("sa_sequence_subjects_in_process", "Subjects with an outstanding per-subject sequence check"),
        &["stream"]
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ADMISSIONS_TOTAL.clone()),
        Box::new(REJECTIONS_TOTAL.clone()),
        Box::new(INFLIGHT_BYTES.clone()),
        Box::new(COUNTER_SUBJECTS.clone()),
        Box::new(SUBJECTS_IN_PROCESS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Record one admitted candidate.
pub fn record_admission(stream: &str) {
    ADMISSIONS_TOTAL.with_label_values(&[stream]).inc();
}

/// Record one rejection of the given kind.
pub fn record_rejection(stream: &str, kind: &str) {
    REJECTIONS_TOTAL.with_label_values(&[stream, kind]).inc();
}

/// Publish the current size of the per-stream admission state.
pub fn observe_state(
    stream: &str,
    inflight_bytes: u64,
    counter_subjects: usize,
    in_process: usize,
) {
    INFLIGHT_BYTES
        .with_label_values(&[stream])
        .set(inflight_bytes as f64);
    COUNTER_SUBJECTS
        .with_label_values(&[stream])
        .set(counter_subjects as f64);
    SUBJECTS_IN_PROCESS
        .with_label_values(&[stream])
        .set(in_process as f64);
}
