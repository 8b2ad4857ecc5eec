use serde::Serialize;

/// Point-in-time snapshot of every aggregate the sink can answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub duration_secs: u64,
    pub tests_total: u64,
    pub tests_finished: u64,
    pub success_total: u64,
    pub failures_total: u64,
    pub errors_total: u64,
    pub hits_total: u64,
    pub urls: Vec<String>,
    pub tests_per_sec: f64,
    pub requests_per_sec: f64,
    pub average_request_time_secs: f64,
    pub hits_success_rate: f64,
    pub test_success_rate: Option<f64>,
    pub average_test_duration_secs: Option<f64>,
    pub request_time_p50_ms: Option<f64>,
    pub request_time_p90_ms: Option<f64>,
    pub request_time_p99_ms: Option<f64>,
    pub sockets_open: i64,
    pub socket_bytes_received: u64,
}

impl RunSummary {
    /// Invocations that reported a failure or an error.
    pub fn has_problems(&self) -> bool {
        self.failures_total > 0 || self.errors_total > 0
    }
}
