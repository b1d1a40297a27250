use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref MESSAGES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_messages_total",
        "Total messages attempted after watermark filtering"
    ))
    .unwrap();
    pub static ref POINTS_WRITTEN_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_points_written_total",
        "Total decoded readings written to the store"
    ))
    .unwrap();
    pub static ref SKIPPED_PAYLOADS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_skipped_payloads_total",
        "Total payloads skipped as too short or pure padding"
    ))
    .unwrap();
    pub static ref DECODE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_decode_failures_total",
        "Total payloads that failed hex decoding"
    ))
    .unwrap();
    pub static ref WRITE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_write_failures_total",
        "Total store write failures"
    ))
    .unwrap();
    pub static ref FETCH_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_fetch_failures_total",
        "Total telemetry API fetch failures (surfaced as empty batches)"
    ))
    .unwrap();
    pub static ref SATELLITE_TS_FALLBACK_TOTAL: Counter = Counter::with_opts(Opts::new(
        "bridge_satellite_ts_fallback_total",
        "16-char payloads whose embedded epoch was invalid, falling back to server time"
    ))
    .unwrap();
    pub static ref BATCH_SIZE: Gauge = Gauge::with_opts(Opts::new(
        "bridge_batch_size",
        "Size of the batch currently being processed"
    ))
    .unwrap();
    pub static ref CYCLE_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "bridge_cycle_seconds",
            "Time taken by one fetch-decode-write cycle"
        )
        .buckets(vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(MESSAGES_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(POINTS_WRITTEN_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(SKIPPED_PAYLOADS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(DECODE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(WRITE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(FETCH_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(SATELLITE_TS_FALLBACK_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(BATCH_SIZE.clone())).unwrap();
    REGISTRY.register(Box::new(CYCLE_SECONDS.clone())).unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
