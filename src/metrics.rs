/// Metrics and telemetry for SASM-IMS
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Account and session activity
/// - Application workflow events
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Account Metrics ==========

    /// Account creations by role
    pub static ref ACCOUNT_CREATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "account_creations_total",
        "Total number of accounts created",
        &["role"]
    )
    .unwrap();

    /// Active sessions
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of active sessions"
    )
    .unwrap();

    // ========== Workflow Metrics ==========

    /// Application status transitions by target status
    pub static ref STATUS_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "status_transitions_total",
        "Total number of application status transitions",
        &["status"]
    )
    .unwrap();

    /// Uploaded requirement files by kind
    pub static ref UPLOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "uploads_total",
        "Total number of requirement uploads",
        &["kind"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();

    /// Records moved to the archive tables by kind
    pub static ref ARCHIVED_RECORDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "archived_records_total",
        "Total number of records archived",
        &["kind"]
    )
    .unwrap();

    // ========== Error Metrics ==========

    /// Errors by error type
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of errors",
        &["error_type", "module"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record an account creation
pub fn record_account_creation(role: &str) {
    ACCOUNT_CREATIONS_TOTAL.with_label_values(&[role]).inc();
}

/// Record a newly opened session
pub fn record_session_opened() {
    SESSIONS_ACTIVE.inc();
}

/// Record closed sessions (signout, password change, cleanup)
pub fn record_sessions_closed(count: u64) {
    SESSIONS_ACTIVE.sub(count as i64);
}

/// Record an application status transition
pub fn record_status_transition(status: &str) {
    STATUS_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a requirement upload
pub fn record_upload(kind: &str) {
    UPLOADS_TOTAL.with_label_values(&[kind]).inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}

/// Record archived rows
pub fn record_archived(kind: &str, count: u64) {
    ARCHIVED_RECORDS_TOTAL
        .with_label_values(&[kind])
        .inc_by(count);
}

/// Record an error
pub fn record_error(error_type: &str, module: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type, module]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/applications", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_background_job() {
        record_background_job("archival", "success", 1.5);
        let metrics = render_metrics();
        assert!(metrics.contains("background_jobs_total"));
        assert!(metrics.contains("background_job_duration_seconds"));
    }

    #[test]
    fn test_session_and_error_metrics_render() {
        record_session_opened();
        record_sessions_closed(1);
        record_error("InternalServerError", "api");
        let metrics = render_metrics();
        assert!(metrics.contains("sessions_active"));
        assert!(metrics.contains("errors_total"));
    }

    #[test]
    fn test_record_workflow_events() {
        record_status_transition("shortlisted");
        record_upload("grades");
        record_archived("application", 3);
        let metrics = render_metrics();
        assert!(metrics.contains("status_transitions_total"));
        assert!(metrics.contains("uploads_total"));
        assert!(metrics.contains("archived_records_total"));
    }
}
