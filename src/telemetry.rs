use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Level comes from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on `addr`.
pub fn install_metrics_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    Ok(())
}

pub fn describe_metrics() {
    metrics::describe_counter!(
        "producer_images_sampled_total",
        "Images drawn from the pool for face scanning"
    );
    metrics::describe_counter!(
        "producer_images_enqueued_total",
        "Images with a face above the confidence threshold"
    );
    metrics::describe_counter!(
        "producer_images_failed_total",
        "Images skipped after a fetch, detection or enqueue failure"
    );
    metrics::describe_counter!(
        "consumer_messages_processed_total",
        "Image messages taken off the work queue"
    );
    metrics::describe_counter!(
        "consumer_matches_logged_total",
        "Images whose text contained the target phrase"
    );
    metrics::describe_counter!(
        "consumer_messages_failed_total",
        "Image messages that failed download or text extraction"
    );
    metrics::describe_histogram!(
        "consumer_extraction_seconds",
        "Time spent in the text extraction service per image"
    );
}
