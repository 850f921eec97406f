//! Prometheus request telemetry for the HTTP boundary.
//!
//! ## Metrics
//!
//! - `http_requests_total{path}`: requests served, by route
//! - `http_request_latency_seconds_sum{path}`: accumulated handling time
//! - `yts_build_info`: version labels, always 1

use prometheus::{CounterVec, Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Label used for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Per-route counters shared by every worker.
///
/// Updates are atomic inside the prometheus crate, so clones can be handed
/// to threads freely.
#[derive(Clone)]
pub struct RequestMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    latency_seconds_sum: CounterVec,
}

impl RequestMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests by route"),
            &["path"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let latency_seconds_sum = CounterVec::new(
            Opts::new(
                "http_request_latency_seconds_sum",
                "Accumulated request handling time in seconds",
            ),
            &["path"],
        )?;
        registry.register(Box::new(latency_seconds_sum.clone()))?;

        let build_info = IntGauge::with_opts(
            Opts::new("yts_build_info", "Build information")
                .const_label("version", env!("CARGO_PKG_VERSION"))
                .const_label("rust_version", env!("CARGO_PKG_RUST_VERSION")),
        )?;
        build_info.set(1);
        registry.register(Box::new(build_info))?;

        Ok(Self {
            registry,
            requests_total,
            latency_seconds_sum,
        })
    }

    /// Count one request against `path` and add its handling time.
    pub fn observe(&self, path: &str, elapsed_secs: f64) {
        self.requests_total.with_label_values(&[path]).inc();
        if elapsed_secs.is_finite() && elapsed_secs >= 0.0 {
            self.latency_seconds_sum
                .with_label_values(&[path])
                .inc_by(elapsed_secs);
        }
    }

    /// Requests counted so far for `path`.
    pub fn request_count(&self, path: &str) -> u64 {
        self.requests_total.with_label_values(&[path]).get()
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_rendered() {
        let metrics = RequestMetrics::new().unwrap();
        let output = metrics.render().unwrap();
        assert!(output.contains("# TYPE yts_build_info gauge"));
        assert!(output.contains(&format!("version=\"{}\"", env!("CARGO_PKG_VERSION"))));
    }

    #[test]
    fn test_observe_counts_per_path() {
        let metrics = RequestMetrics::new().unwrap();
        metrics.observe("/predict", 0.25);
        metrics.observe("/predict", 0.5);
        metrics.observe("/health", 0.001);

        assert_eq!(metrics.request_count("/predict"), 2);
        let output = metrics.render().unwrap();
        assert!(output.contains("http_requests_total{path=\"/predict\"} 2"));
        assert!(output.contains("http_requests_total{path=\"/health\"} 1"));
        assert!(output.contains("http_request_latency_seconds_sum{path=\"/predict\"} 0.75"));
    }

    #[test]
    fn test_negative_elapsed_only_counts() {
        let metrics = RequestMetrics::new().unwrap();
        metrics.observe(UNMATCHED_PATH, -1.0);
        assert_eq!(metrics.request_count(UNMATCHED_PATH), 1);
        let output = metrics.render().unwrap();
        assert!(output.contains("# TYPE http_requests_total counter"));
    }
}
