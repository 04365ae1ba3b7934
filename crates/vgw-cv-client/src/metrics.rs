//! CV call metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Worker calls by operation and outcome.
    pub const REQUESTS_TOTAL: &str = "cv_requests_total";

    /// Worker call latency in seconds by operation.
    pub const REQUEST_DURATION_SECONDS: &str = "cv_request_duration_seconds";
}

/// Record a finished worker call. `status` is the HTTP status or an error label.
pub fn record_request(operation: &str, status: &str, duration_secs: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}
