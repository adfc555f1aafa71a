//! Prometheus metrics for the ttsgate server
//!
//! Exposes metrics in Prometheus format for monitoring and observability.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry for ttsgate metrics
    pub static ref REGISTRY: Registry = Registry::new();

    // ============== Request Metrics ==============

    /// Synthesis requests by model and outcome
    pub static ref REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("requests_total", "Total number of synthesis requests")
            .namespace("ttsgate"),
        &["model", "status"]
    ).expect("metric can be created");

    /// End-to-end admission latency
    pub static ref REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "request_duration_seconds",
            "Request duration in seconds"
        )
        .namespace("ttsgate")
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["model"]
    ).expect("metric can be created");

    // ============== Cache Metrics ==============

    pub static ref CACHE_HITS_TOTAL: Counter = Counter::with_opts(
        Opts::new("cache_hits_total", "Total result cache hits")
            .namespace("ttsgate")
    ).expect("metric can be created");

    pub static ref CACHE_MISSES_TOTAL: Counter = Counter::with_opts(
        Opts::new("cache_misses_total", "Total result cache misses")
            .namespace("ttsgate")
    ).expect("metric can be created");

    pub static ref CACHE_EVICTIONS_TOTAL: Counter = Counter::with_opts(
        Opts::new("cache_evictions_total", "Total result cache evictions")
            .namespace("ttsgate")
    ).expect("metric can be created");

    pub static ref CACHE_SIZE: Gauge = Gauge::with_opts(
        Opts::new("cache_size", "Current result cache size (entries)")
            .namespace("ttsgate")
    ).expect("metric can be created");

    // ============== Dispatch Metrics ==============

    /// Tasks waiting in a model's queue
    pub static ref QUEUE_DEPTH: GaugeVec = GaugeVec::new(
        Opts::new("queue_depth", "Tasks waiting for a worker")
            .namespace("ttsgate"),
        &["model"]
    ).expect("metric can be created");

    /// Syntheses currently running on a blocking thread
    pub static ref ACTIVE_SYNTHESES: GaugeVec = GaugeVec::new(
        Opts::new("active_syntheses", "Syntheses currently running")
            .namespace("ttsgate"),
        &["model"]
    ).expect("metric can be created");

    /// Requests refused because the model's queue was full
    pub static ref REQUESTS_REJECTED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("requests_rejected_total", "Total requests rejected due to queue full")
            .namespace("ttsgate"),
        &["model"]
    ).expect("metric can be created");

    // ============== Model Metrics ==============

    pub static ref MODEL_LOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("model_loads_total", "Model load attempts")
            .namespace("ttsgate"),
        &["model", "status"]
    ).expect("metric can be created");

    pub static ref MODEL_LOAD_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("model_load_seconds", "Time spent loading a model")
            .namespace("ttsgate")
            .buckets(vec![0.1, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        &["model"]
    ).expect("metric can be created");
}

/// Register all metrics with the global registry.
/// Should be called once at startup.
pub fn register_metrics() -> prometheus::Result<()> {
    // Request metrics
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEST_DURATION_SECONDS.clone()))?;

    // Cache metrics
    REGISTRY.register(Box::new(CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_EVICTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_SIZE.clone()))?;

    // Dispatch metrics
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(ACTIVE_SYNTHESES.clone()))?;
    REGISTRY.register(Box::new(REQUESTS_REJECTED_TOTAL.clone()))?;

    // Model metrics
    REGISTRY.register(Box::new(MODEL_LOADS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MODEL_LOAD_SECONDS.clone()))?;

    Ok(())
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# Error encoding metrics: {}", e))
}

/// Tracks one admission from start to outcome.
/// Dropping it without recording counts as an error.
pub struct RequestTimer {
    model: String,
    start: std::time::Instant,
    recorded: bool,
}

impl RequestTimer {
    /// Start a new request timer for the given model.
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            start: std::time::Instant::now(),
            recorded: false,
        }
    }

    /// Milliseconds since the timer started
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Record the outcome under `status` (e.g. `success`, `cache_hit`, `rejected`).
    pub fn finish(mut self, status: &str) {
        self.record(status);
    }

    fn record(&mut self, status: &str) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        REQUEST_DURATION_SECONDS
            .with_label_values(&[&self.model])
            .observe(self.start.elapsed().as_secs_f64());
        REQUESTS_TOTAL
            .with_label_values(&[&self.model, status])
            .inc();
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.record("error");
    }
}

/// Record a cache lookup outcome.
pub fn record_cache_lookup(hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.inc();
    } else {
        CACHE_MISSES_TOTAL.inc();
    }
}

/// Record a cache eviction.
pub fn record_cache_eviction() {
    CACHE_EVICTIONS_TOTAL.inc();
}

/// Update cache size gauge.
pub fn set_cache_size(size: usize) {
    CACHE_SIZE.set(size as f64);
}

/// Update a model's queue depth gauge.
pub fn set_queue_depth(model: &str, depth: u64) {
    QUEUE_DEPTH.with_label_values(&[model]).set(depth as f64);
}

/// Update a model's running-synthesis gauge.
pub fn set_active_syntheses(model: &str, active: u64) {
    ACTIVE_SYNTHESES.with_label_values(&[model]).set(active as f64);
}

/// Record a rejected request.
pub fn record_rejected(model: &str) {
    REQUESTS_REJECTED_TOTAL.with_label_values(&[model]).inc();
}

/// Record a model load attempt and how long it took.
pub fn record_model_load(model: &str, success: bool, secs: f64) {
    let status = if success { "success" } else { "error" };
    MODEL_LOADS_TOTAL.with_label_values(&[model, status]).inc();
    MODEL_LOAD_SECONDS.with_label_values(&[model]).observe(secs);
}
