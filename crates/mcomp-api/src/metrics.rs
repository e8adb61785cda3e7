//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder and return the render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "mcomp_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "mcomp_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "mcomp_http_requests_in_flight";

    // Job metrics
    pub const JOBS_CREATED_TOTAL: &str = "mcomp_jobs_created_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "mcomp_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "mcomp_jobs_failed_total";
    pub const JOBS_CLEANED_TOTAL: &str = "mcomp_jobs_cleaned_total";

    // Processing metrics
    pub const COMPRESSION_DURATION_SECONDS: &str = "mcomp_compression_duration_seconds";
    pub const UPLOAD_BYTES_TOTAL: &str = "mcomp_upload_bytes_total";
    pub const BYTES_SAVED_TOTAL: &str = "mcomp_bytes_saved_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "mcomp_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_created(kind: &str) {
    counter!(names::JOBS_CREATED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_job_completed(kind: &str, original_size: u64, compressed_size: u64) {
    counter!(names::JOBS_COMPLETED_TOTAL, "kind" => kind.to_string()).increment(1);
    counter!(names::BYTES_SAVED_TOTAL).increment(original_size.saturating_sub(compressed_size));
}

pub fn record_job_failed(kind: &str) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_jobs_cleaned(count: usize) {
    counter!(names::JOBS_CLEANED_TOTAL).increment(count as u64);
}

pub fn record_compression_duration(kind: &str, duration_secs: f64) {
    histogram!(names::COMPRESSION_DURATION_SECONDS, "kind" => kind.to_string())
        .record(duration_secs);
}

pub fn record_upload_bytes(bytes: u64) {
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

pub fn record_rate_limit_hit(endpoint: &str) {
    counter!(names::RATE_LIMIT_HITS_TOTAL, "endpoint" => sanitize_path(endpoint)).increment(1);
}

/// Collapse per-job path segments so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    static JOB_SEGMENT: OnceLock<Regex> = OnceLock::new();
    let re = JOB_SEGMENT.get_or_init(|| {
        Regex::new(r"^/(job|download|thumbnail)/[^/]+$")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    });
    re.replace(path, "/$1/:job_id").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let elapsed = start.elapsed().as_secs_f64();
    record_http_request(&method, &path, status, elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/job/ab12cd34"), "/job/:job_id");
        assert_eq!(sanitize_path("/download/ab12cd34"), "/download/:job_id");
        assert_eq!(sanitize_path("/thumbnail/ff00ff00"), "/thumbnail/:job_id");
        assert_eq!(sanitize_path("/download-all"), "/download-all");
        assert_eq!(sanitize_path("/jobs"), "/jobs");
    }
}
