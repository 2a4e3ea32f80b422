//! Prometheus metrics for the cipher gateway.
//!
//! All metrics follow the naming convention: `cg_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: lifecycle outcomes (e.g. `cg_requests_completed_total`)
//! - **Gauge**: escrow currently held by unresolved requests
//! - **Histogram**: off-band computation latency

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LIFECYCLE METRICS (cg-01)
    // =========================================================================

    /// Requests accepted by `submit`
    pub static ref REQUESTS_SUBMITTED: IntCounter = IntCounter::new(
        "cg_requests_submitted_total",
        "Total number of requests submitted"
    ).expect("metric creation failed");

    /// Requests that reached `Completed`
    pub static ref REQUESTS_COMPLETED: IntCounter = IntCounter::new(
        "cg_requests_completed_total",
        "Total number of requests completed by a gateway callback"
    ).expect("metric creation failed");

    /// Requests the gateway reported as failed
    pub static ref REQUESTS_FAILED: IntCounter = IntCounter::new(
        "cg_requests_failed_total",
        "Total number of requests reported failed by the gateway"
    ).expect("metric creation failed");

    /// Refunds paid out
    pub static ref REFUNDS: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_refunds_total", "Total refunds paid out"),
        &["trigger"]  // trigger: requester/forced
    ).expect("metric creation failed");

    /// Rejected calls by error kind
    pub static ref REJECTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_rejections_total", "Rejected lifecycle calls by error kind"),
        &["kind"]
    ).expect("metric creation failed");

    /// Wei currently escrowed by unresolved requests, saturated to i64
    pub static ref ESCROW_HELD: IntGauge = IntGauge::new(
        "cg_escrow_held_wei",
        "Escrow held for requests that are not yet resolved"
    ).expect("metric creation failed");

    // =========================================================================
    // GATEWAY METRICS (cg-02)
    // =========================================================================

    /// Off-band computation duration
    pub static ref COMPUTE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cg_gateway_compute_duration_seconds",
            "Time spent computing over a request payload"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0])
    ).expect("metric creation failed");

    /// Gateway outcomes per request
    pub static ref GATEWAY_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("cg_gateway_outcomes_total", "Gateway worker outcomes"),
        &["outcome"]  // outcome: completed/failed/timeout/rejected
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Lifecycle
        Box::new(REQUESTS_SUBMITTED.clone()),
        Box::new(REQUESTS_COMPLETED.clone()),
        Box::new(REQUESTS_FAILED.clone()),
        Box::new(REFUNDS.clone()),
        Box::new(REJECTIONS.clone()),
        Box::new(ESCROW_HELD.clone()),
        // Gateway
        Box::new(COMPUTE_DURATION.clone()),
        Box::new(GATEWAY_OUTCOMES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::Metrics(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all registered metrics as Prometheus text format.
pub fn gather_text() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
