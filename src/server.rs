// src/server.rs

//! HTTP front for the limiter.
//!
//! `GET /api` runs admission, `GET /metrics` reports counters and bucket
//! level as JSON, `POST /config` swaps in a new bucket, `POST /reset` zeroes
//! the request counters. Every route answers CORS for any origin.

// dependencies
use crate::clock::{Clock, ClockError};
use crate::config::LeakyBucketConfig;
use crate::errors::LeakyBucketError;
use crate::handle::LimiterHandle;
use crate::stats::RequestStats;
use axum::{
    Form, Json, Router, async_trait,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<LimiterHandle>,
    pub stats: Arc<RequestStats>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(limiter: Arc<LimiterHandle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiter,
            stats: Arc::new(RequestStats::new()),
            clock,
        }
    }
}

/// Body of `GET /metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub total: u64,
    pub allowed: u64,
    pub rejected: u64,
    pub current_level: usize,
    pub capacity: usize,
}

/// Form fields of `POST /config`; `rate` is a duration such as `1s` or `250ms`.
///
/// Read from a urlencoded or multipart body, falling back to the query
/// string for fields the body lacks. A request without a body yields empty
/// fields, which `parse_config` rejects.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigForm {
    #[serde(default)]
    pub capacity: Option<String>,
    #[serde(default)]
    pub rate: Option<String>,
}

impl ConfigForm {
    // body values win over query values
    fn or(self, fallback: ConfigForm) -> ConfigForm {
        ConfigForm {
            capacity: self.capacity.or(fallback.capacity),
            rate: self.rate.or(fallback.rate),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<ConfigForm, Response> {
        let mut form = ConfigForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let slot = match field.name() {
                Some("capacity") => &mut form.capacity,
                Some("rate") => &mut form.rate,
                _ => continue,
            };
            *slot = Some(field.text().await.map_err(IntoResponse::into_response)?);
        }
        Ok(form)
    }
}

#[async_trait]
impl<S> FromRequest<S> for ConfigForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<ConfigForm>::try_from_uri(req.uri())
            .map(|Query(form)| form)
            .unwrap_or_default();

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let body = if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Self::from_multipart(multipart).await?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<ConfigForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            form
        } else {
            ConfigForm::default()
        };

        Ok(body.or(query))
    }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid capacity value")]
    InvalidCapacity,
    #[error("Invalid rate value")]
    InvalidRate,
    #[error(transparent)]
    Bucket(#[from] LeakyBucketError),
    #[error(transparent)]
    Clock(#[from] ClockError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCapacity
            | Self::InvalidRate
            | Self::Bucket(LeakyBucketError::InvalidCapacity)
            | Self::Bucket(LeakyBucketError::InvalidLeakInterval) => StatusCode::BAD_REQUEST,
            Self::Bucket(LeakyBucketError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

// Routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api", get(admit))
        .route("/metrics", get(metrics))
        .route("/config", post(configure))
        .route("/reset", post(reset))
        .layer(cors)
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "http server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

// Handlers

async fn admit(State(state): State<AppState>) -> Response {
    let admitted = state.limiter.allow();
    state.stats.record(admitted);

    if admitted {
        (StatusCode::OK, "Request processed").into_response()
    } else {
        (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
    }
}

async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
    let timestamp = state.clock.now()? / NANOS_PER_SECOND;
    let bucket = state.limiter.status();
    let stats = state.stats.snapshot();

    Ok(Json(MetricsResponse {
        timestamp,
        total: stats.total,
        allowed: stats.allowed,
        rejected: stats.rejected,
        current_level: bucket.level,
        capacity: bucket.capacity,
    }))
}

async fn configure(
    State(state): State<AppState>,
    form: ConfigForm,
) -> Result<&'static str, ApiError> {
    let config = parse_config(&form).inspect_err(|err| {
        warn!(error = %err, capacity = ?form.capacity, rate = ?form.rate, "rejected reconfiguration");
    })?;
    state.limiter.reconfigure(config)?;
    Ok("Configuration updated")
}

async fn reset(State(state): State<AppState>) -> &'static str {
    state.stats.reset();
    info!("request statistics reset");
    "Statistics reset"
}

/// Validate both form fields before any bucket is built.
pub fn parse_config(form: &ConfigForm) -> Result<LeakyBucketConfig, ApiError> {
    let capacity = form
        .capacity
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|capacity| *capacity >= 1)
        .ok_or(ApiError::InvalidCapacity)?;

    let leak_interval = form
        .rate
        .as_deref()
        .and_then(|raw| humantime::parse_duration(raw.trim()).ok())
        .filter(|interval| !interval.is_zero())
        .ok_or(ApiError::InvalidRate)?;

    Ok(LeakyBucketConfig::new(capacity, leak_interval))
}
