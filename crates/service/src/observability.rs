use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static REMOTE_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "watch_admin_remote_requests_total",
        "Total requests sent to the remote bin store"
    )
    .expect("register remote_requests_total")
});

pub static REMOTE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "watch_admin_remote_failures_total",
        "Remote bin requests that failed or returned non-2xx"
    )
    .expect("register remote_failures_total")
});

pub static FALLBACK_READS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "watch_admin_fallback_reads_total",
        "Collection reads served from the local cache"
    )
    .expect("register fallback_reads_total")
});

pub static LOCAL_BACKUPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "watch_admin_local_backups_total",
        "Collection snapshots mirrored to the local cache"
    )
    .expect("register local_backups_total")
});

pub static REMOTE_REQUEST_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "watch_admin_remote_request_duration_seconds",
        "Remote bin request duration in seconds",
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register remote_request_duration")
});

/// Render the default registry in the prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
