use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use tracing::{error, info};

/// Metric name prefix for all mirror metrics
const PREFIX: &str = "catalog_mirror";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    pub static ref UPSTREAM_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upstream_requests_total"), "Calls made to the upstream catalog"),
        &["endpoint", "outcome"]
    ).expect("Failed to create upstream_requests_total metric");

    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_upstream_request_duration_seconds"),
            "Upstream call duration in seconds"
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["endpoint"]
    ).expect("Failed to create upstream_request_duration_seconds metric");

    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_cache_lookups_total"), "Read-through lookups by result"),
        &["kind", "result"]
    ).expect("Failed to create cache_lookups_total metric");

    pub static ref BACKGROUND_TASKS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_tasks_total"), "Finished background sync tasks"),
        &["task", "outcome"]
    ).expect("Failed to create background_tasks_total metric");

    pub static ref TOKEN_REFRESHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_token_refreshes_total"), "Upstream credential refreshes"),
        &["outcome"]
    ).expect("Failed to create token_refreshes_total metric");

    pub static ref CATALOG_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_catalog_items_total"), "Entities held by the local store"),
        &["type"]
    ).expect("Failed to create catalog_items_total metric");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn init_metrics() {
    // Already-registered errors are expected when tests call this repeatedly
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(UPSTREAM_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_TASKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TOKEN_REFRESHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_ITEMS_TOTAL.clone()));

    info!("Metrics system initialized");
}

pub fn set_catalog_items(artists: usize, albums: usize, tracks: usize) {
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["artist"])
        .set(artists as f64);
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["album"])
        .set(albums as f64);
    CATALOG_ITEMS_TOTAL
        .with_label_values(&["track"])
        .set(tracks as f64);
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_upstream_request(endpoint: &str, success: bool, duration: Duration) {
    let outcome = if success { "success" } else { "failure" };
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
    UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration.as_secs_f64());
}

/// `result` is one of "hit", "partial" or "miss".
pub fn record_cache_lookup(kind: &str, result: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[kind, result]).inc();
}

pub fn record_background_task(task: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    BACKGROUND_TASKS_TOTAL
        .with_label_values(&[task, outcome])
        .inc();
}

pub fn record_token_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    TOKEN_REFRESHES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_family(name: &str) -> Option<prometheus::proto::MetricFamily> {
        REGISTRY
            .gather()
            .into_iter()
            .find(|m| m.get_name() == format!("{PREFIX}_{name}"))
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        init_metrics();
        assert!(!REGISTRY.gather().is_empty());
    }

    #[test]
    fn test_record_upstream_request() {
        init_metrics();
        record_upstream_request("album", true, Duration::from_millis(120));
        record_upstream_request("album", false, Duration::from_millis(20));

        assert!(find_family("upstream_requests_total").is_some());
        assert!(find_family("upstream_request_duration_seconds").is_some());
    }

    #[test]
    fn test_record_cache_lookup_and_background() {
        init_metrics();
        record_cache_lookup("artist", "partial");
        record_background_task("album_cascade", false);
        record_token_refresh(true);

        let lookups = CACHE_LOOKUPS_TOTAL
            .with_label_values(&["artist", "partial"])
            .get();
        assert!(lookups >= 1.0);
        assert!(find_family("background_tasks_total").is_some());
        assert!(find_family("token_refreshes_total").is_some());
    }

    #[test]
    fn test_catalog_items_gauge() {
        init_metrics();
        set_catalog_items(3, 5, 40);
        assert_eq!(CATALOG_ITEMS_TOTAL.with_label_values(&["track"]).get(), 40.0);
    }
}
