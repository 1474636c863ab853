//! Prometheus metrics exposition
//!
//! - `oauth_exchanges_total` (counter): label `result`
//! - `token_refreshes_total` (counter): labels `result`, `trigger`
//! - `catalog_fetches_total` (counter): label `result`
//! - `catalog_fetch_duration_seconds` (histogram)

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Configures `catalog_fetch_duration_seconds` with explicit buckets so it
/// renders as a histogram (with `_bucket` lines usable by
/// `histogram_quantile()`) rather than the default summary. The catalog
/// endpoint returns the full cosmetics dump, so the buckets run up to 30s.
///
/// The handle's `render()` method produces the Prometheus text exposition
/// format served on `/metrics`.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "catalog_fetch_duration_seconds".to_string(),
            ),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record the outcome of an authorization-code exchange.
pub fn record_exchange(result: &str) {
    metrics::counter!("oauth_exchanges_total", "result" => result.to_string()).increment(1);
}

/// Record the outcome of a refresh-token exchange.
///
/// `trigger` distinguishes refreshes requested through `/refresh` from the
/// opportunistic ones the cosmetics path performs near token expiry.
pub fn record_refresh(result: &str, trigger: &str) {
    metrics::counter!(
        "token_refreshes_total",
        "result" => result.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

/// Record a catalog fetch with its outcome and wall-clock duration.
pub fn record_catalog_fetch(result: &str, duration_secs: f64) {
    metrics::counter!("catalog_fetches_total", "result" => result.to_string()).increment(1);
    metrics::histogram!("catalog_fetch_duration_seconds").record(duration_secs);
}
