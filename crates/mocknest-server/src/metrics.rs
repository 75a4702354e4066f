//! Prometheus metrics for mocknest-server.
//!
//! Tracks execution outcomes, end-to-end latency, and dropped request-log
//! entries.
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    /// Total number of mock executions by method and outcome
    pub static ref EXECUTIONS_TOTAL: CounterVec = register_counter_vec!(
        "mocknest_executions_total",
        "Total number of mock executions processed",
        &["method", "outcome"]  // outcome: matched|project_not_found|mock_not_found|no_response_defined|internal_error
    )
    .unwrap();

    /// End-to-end execution duration in milliseconds
    pub static ref EXECUTION_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mocknest_execution_duration_ms",
        "Histogram of end-to-end mock execution time in milliseconds",
        &["method"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();

    /// Request log entries dropped before reaching the store
    pub static ref LOG_DROPS_TOTAL: CounterVec = register_counter_vec!(
        "mocknest_request_log_drops_total",
        "Request log entries dropped before reaching the store",
        &["reason"]  // reason: queue_full|store_error
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Helper to record an execution outcome
pub fn record_execution(method: &str, outcome: &str) {
    EXECUTIONS_TOTAL.with_label_values(&[method, outcome]).inc();
}

/// Helper to observe execution latency
pub fn observe_execution_duration(method: &str, elapsed_ms: f64) {
    EXECUTION_DURATION_MS
        .with_label_values(&[method])
        .observe(elapsed_ms);
}

/// Helper to record a dropped request-log entry
pub fn record_log_drop(reason: &str) {
    LOG_DROPS_TOTAL.with_label_values(&[reason]).inc();
}

/// Serve the Prometheus text exposition on the given port.
pub async fn serve(port: u16) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics exporter listening on http://{addr}/metrics");

    loop {
        let (stream, remote_addr) = listener.accept().await?;
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(|_req: Request<hyper::body::Incoming>| async {
                Ok::<_, Infallible>(
                    Response::builder()
                        .header("Content-Type", "text/plain; version=0.0.4")
                        .body(Full::new(Bytes::from(collect_metrics())))
                        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))),
                )
            });
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving metrics connection from {remote_addr}: {err}");
            }
        });
    }
}
