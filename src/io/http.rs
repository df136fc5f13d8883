//! Receipt HTTP API
//!
//! Routes:
//! - `POST /receipts/process` (alias `POST /process`) -> 201 `{"id": ...}`
//! - `GET /receipts/{id}/points` (alias `GET /points/{id}`) -> 200 `{"points": ...}`
//! - `GET /health`
//! - `GET /metrics` (Prometheus text format)
//!
//! Uses hyper for the HTTP server. Routing is a plain match over method and
//! path so it can be exercised without a socket.

use crate::domain::receipt::{Receipt, ReceiptError};
use crate::infra::metrics::Metrics;
use crate::io::prometheus;
use crate::services::receipt_store::ReceiptStore;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Largest request body accepted for a receipt
const MAX_BODY_BYTES: usize = 64 * 1024;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Shared state handed to every connection
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReceiptStore>,
    pub metrics: Arc<Metrics>,
    /// Serve `/metrics`; when off the path answers 404
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(store: Arc<ReceiptStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics, metrics_enabled: true }
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Process,
    Points(&'a str),
    Health,
    Metrics,
    Unknown,
}

fn match_route(path: &str) -> Route<'_> {
    match path {
        "/receipts/process" | "/process" => return Route::Process,
        "/health" => return Route::Health,
        "/metrics" => return Route::Metrics,
        _ => {}
    }

    let id = path
        .strip_prefix("/receipts/")
        .and_then(|rest| rest.strip_suffix("/points"))
        .or_else(|| path.strip_prefix("/points/"));

    match id {
        Some(id) if !id.contains('/') => Route::Points(id),
        _ => Route::Unknown,
    }
}

fn response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(body.into()))
        .expect("static response should not fail")
}

fn text(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    response(status, CONTENT_TYPE_TEXT, format!("{message}\n"))
}

fn json(status: StatusCode, value: serde_json::Value) -> Response<Full<Bytes>> {
    response(status, CONTENT_TYPE_JSON, value.to_string())
}

/// Dispatch a request whose body has already been read
pub fn route(
    state: &AppState,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    match (match_route(path), method) {
        (Route::Process, &Method::POST) => process_receipt(state, body),
        (Route::Points(id), &Method::GET) => get_points(state, id),
        (Route::Health, &Method::GET) => text(StatusCode::OK, "Server is running"),
        (Route::Metrics, _) if !state.metrics_enabled => text(StatusCode::NOT_FOUND, "Not Found"),
        (Route::Metrics, &Method::GET) => response(
            StatusCode::OK,
            prometheus::CONTENT_TYPE,
            prometheus::format_prometheus_metrics(&state.metrics, state.store.len()),
        ),
        (Route::Unknown, _) => text(StatusCode::NOT_FOUND, "Not Found"),
        (_, _) => text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
    }
}

fn process_receipt(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    let start = Instant::now();

    let receipt = match Receipt::from_json(body) {
        Ok(receipt) => receipt,
        Err(e) => {
            state.metrics.record_receipt_rejected();
            match &e {
                ReceiptError::Malformed(cause) => {
                    warn!(error = %cause, "receipt_rejected_malformed");
                }
                ReceiptError::Invalid(reason) => {
                    warn!(reason = %reason, "receipt_rejected_invalid");
                }
            }
            return text(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let retailer_id = receipt.retailer_id.clone();
    let (id, points) = state.store.submit_scored(receipt);
    let latency_us = start.elapsed().as_micros() as u64;
    state.metrics.record_receipt_processed(latency_us, points);

    info!(
        receipt_id = %id,
        retailer_id = %retailer_id,
        points = %points,
        latency_us = %latency_us,
        "receipt_processed"
    );

    json(StatusCode::CREATED, serde_json::json!({ "id": id }))
}

fn get_points(state: &AppState, id: &str) -> Response<Full<Bytes>> {
    let points = state.store.lookup(id);
    state.metrics.record_lookup(points.is_some());

    match points {
        Some(points) => {
            debug!(receipt_id = %id, points = %points, "points_lookup");
            json(StatusCode::OK, serde_json::json!({ "points": points }))
        }
        None => {
            debug!(receipt_id = %id, "points_lookup_miss");
            text(StatusCode::NOT_FOUND, "Receipt not found")
        }
    }
}

/// Handle HTTP requests
///
/// Only a receipt submission needs its body; a body that fails to read or
/// exceeds the limit rejects the receipt. Other routes ignore the body.
async fn handle_request<B>(
    req: Request<B>,
    state: AppState,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();
    let is_submission = parts.method == Method::POST && match_route(path) == Route::Process;

    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if is_submission => {
            warn!(error = %e, path = %path, "request_body_error");
            state.metrics.record_receipt_rejected();
            return Ok(text(StatusCode::BAD_REQUEST, "Invalid receipt data"));
        }
        Err(e) => {
            debug!(error = %e, path = %path, "request_body_ignored");
            Bytes::new()
        }
    };

    Ok(route(&state, &parts.method, path, &body))
}

/// Serve the API on an already bound listener until shutdown is signalled
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr().context("listener has no local address")?;
    info!(addr = %local_addr, "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender means nobody can signal shutdown anymore
                if changed.is_err() || *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind `addr` and serve the API until shutdown is signalled
pub async fn start_server(
    addr: &str,
    state: AppState,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    serve(listener, state, shutdown).await
}
