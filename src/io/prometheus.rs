//! Prometheus metrics HTTP endpoint
//!
//! Exposes tracker metrics in Prometheus text format at /metrics, a liveness
//! probe at /health and the mounted tracking states as JSON at /shipments.
//! Uses hyper for the HTTP server.

use crate::domain::route::RouteKind;
use crate::infra::metrics::{Metrics, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use crate::services::tracking::TrackingBoard;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with cumulative buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {cumulative}");
}

/// Format metrics in Prometheus text exposition format.
///
/// Reads monotonic values only, so scraping does not disturb the periodic
/// log summary.
fn format_prometheus_metrics(metrics: &Metrics, site_id: &str) -> String {
    let mut output = String::with_capacity(4096);

    write_route_metrics(&mut output, site_id, metrics);
    write_recompute_metrics(&mut output, site_id, metrics);
    write_metric(
        &mut output,
        "freight_active_shipments",
        "Shipments currently mounted",
        MetricType::Gauge,
        site_id,
        metrics.active_shipments(),
    );
    write_metric(
        &mut output,
        "freight_egress_written_total",
        "Tracking snapshots written to egress",
        MetricType::Counter,
        site_id,
        metrics.egress_written_total(),
    );
    write_metric(
        &mut output,
        "freight_egress_failed_total",
        "Tracking snapshots that failed to write",
        MetricType::Counter,
        site_id,
        metrics.egress_failed_total(),
    );

    output
}

fn write_route_metrics(output: &mut String, site: &str, metrics: &Metrics) {
    let _ = writeln!(output, "# HELP freight_routes_total Routes synthesized by kind");
    let _ = writeln!(output, "# TYPE freight_routes_total counter");
    for kind in RouteKind::ALL {
        let _ = writeln!(
            output,
            "freight_routes_total{{site=\"{site}\",kind=\"{}\"}} {}",
            kind.as_str(),
            metrics.routes_total(kind)
        );
    }

    write_metric(
        output,
        "freight_invalid_inputs_total",
        "Inputs rejected for invalid coordinates or progress",
        MetricType::Counter,
        site,
        metrics.invalid_inputs_total(),
    );
}

fn write_recompute_metrics(output: &mut String, site: &str, metrics: &Metrics) {
    write_metric(
        output,
        "freight_recomputes_total",
        "Tracking state computations",
        MetricType::Counter,
        site,
        metrics.recomputes_total(),
    );

    let (buckets, sum) = metrics.recompute_latency_totals();
    write_histogram(
        output,
        "freight_recompute_latency_us",
        "Tracking state computation latency in microseconds",
        site,
        &buckets,
        sum,
    );
}

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn shipments_json(board: &TrackingBoard) -> Response<Full<Bytes>> {
    match serde_json::to_string(&board.snapshot()) {
        Ok(body) => respond(StatusCode::OK, "application/json", body),
        Err(e) => {
            error!(error = %e, "shipments_serialize_failed");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "serialization failed".to_string(),
            )
        }
    }
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: Arc<Metrics>,
    board: Arc<TrackingBoard>,
    site_id: Arc<String>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => respond(
            StatusCode::OK,
            PROMETHEUS_CONTENT_TYPE,
            format_prometheus_metrics(&metrics, &site_id),
        ),
        (&Method::GET, "/health") => respond(StatusCode::OK, "text/plain", "ok".to_string()),
        (&Method::GET, "/shipments") => shipments_json(&board),
        _ => respond(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string()),
    };
    Ok(response)
}

/// Start the Prometheus metrics HTTP server
pub async fn start_metrics_server(
    port: u16,
    metrics: Arc<Metrics>,
    board: Arc<TrackingBoard>,
    site_id: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    let site_id = Arc::new(site_id);

    info!(port = %port, site = %site_id, "prometheus_metrics_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let metrics = metrics.clone();
                        let board = board.clone();
                        let site_id = site_id.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let metrics = metrics.clone();
                                let board = board.clone();
                                let site_id = site_id.clone();
                                async move { handle_request(req, metrics, board, site_id).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "prometheus_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "prometheus_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("prometheus_metrics_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
