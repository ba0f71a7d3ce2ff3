//! Prometheus metrics for the todo API.
//!
//! [`Metrics`] owns its own registry instead of relying on a process-global
//! one, so every router (and every test) gets an isolated set of series.
//! Three series are exported:
//!
//! - `requests_total{method, path, status}`: every response served.
//! - `request_latency_histogram{method, path}`: wall time in seconds.
//! - `tasks_count`: live todo items, seeded from the store at startup and
//!   adjusted by the create (and optionally delete) handlers.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus_client::{
    encoding::{EncodeLabelSet, text::encode},
    metrics::{counter::Counter, family::Family, gauge::Gauge, histogram::Histogram},
    registry::Registry,
};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Default Prometheus client buckets, in seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub path: String,
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LatencyLabels {
    pub method: String,
    pub path: String,
}

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    requests_total: Family<RequestLabels, Counter>,
    request_latency: Family<LatencyLabels, Histogram>,
    live_items: Gauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "requests",
            "Total number of HTTP requests",
            requests_total.clone(),
        );

        let request_latency = Family::<LatencyLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(LATENCY_BUCKETS.iter().copied())
        });
        registry.register(
            "request_latency_histogram",
            "HTTP request latency in seconds",
            request_latency.clone(),
        );

        let live_items = Gauge::default();
        registry.register(
            "tasks_count",
            "Current number of todo tasks",
            live_items.clone(),
        );

        Self {
            registry,
            requests_total,
            request_latency,
            live_items,
        }
    }

    pub fn record_request(&self, method: &str, path: &str, status: u16) {
        self.requests_total
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                path: path.to_string(),
                status: status.to_string(),
            })
            .inc();
    }

    pub fn observe_latency(&self, method: &str, path: &str, seconds: f64) {
        self.request_latency
            .get_or_create(&LatencyLabels {
                method: method.to_string(),
                path: path.to_string(),
            })
            .observe(seconds);
    }

    /// Reads a request counter without registering a new series.
    pub fn request_count(&self, method: &str, path: &str, status: u16) -> u64 {
        self.requests_total
            .get(&RequestLabels {
                method: method.to_string(),
                path: path.to_string(),
                status: status.to_string(),
            })
            .map_or(0, |counter| counter.get())
    }

    pub fn inc_live_items(&self) {
        self.live_items.inc();
    }

    pub fn dec_live_items(&self) {
        self.live_items.dec();
    }

    pub fn set_live_items(&self, count: u64) {
        self.live_items.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn live_items(&self) -> i64 {
        self.live_items.get()
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

/// Counts and times every request that passes through the router.
pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    metrics.record_request(&method, &path, response.status().as_u16());
    metrics.observe_latency(&method, &path, started.elapsed().as_secs_f64());

    response
}

pub async fn metrics_handler(State(state): State<AppState>) -> AppResult<Response> {
    let body = state.metrics.encode().map_err(|_| AppError::Internal)?;

    let mut response = body.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(OPENMETRICS_CONTENT_TYPE),
    );
    Ok(response)
}
