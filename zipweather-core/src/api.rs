//! HTTP boundary of both hops.
//!
//! Handlers validate raw input, continue the caller's trace, run the lookup
//! under a per-request context and map [`Error`] variants to status codes.
//! This is the only place that knows about status codes.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::{
    Error,
    context::RequestContext,
    model::{Locality, LookupResult, PostalCode},
    orchestrator::Orchestrator,
    provider::LocalityResolver,
    telemetry,
};

/// Error body returned by both hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status_code: status.as_u16(), message: message.into() }
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidFormat => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid zipcode"),
            Error::LocalityNotFound => Self::new(StatusCode::NOT_FOUND, "can not find zipcode"),
            Error::InvalidApiKey => Self::new(StatusCode::UNAUTHORIZED, "API key is invalid"),
            Error::Transport { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "upstream request failed")
            }
            Error::HttpStatus { status, .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("upstream responded {status}"))
            }
            Error::Decode(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream response could not be decoded",
            ),
            Error::InvalidLocality | Error::OutOfRange(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "implausible weather data")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

fn reject(err: Error) -> ApiError {
    let api = ApiError::from(&err);
    if api.status().is_server_error() {
        tracing::error!(error = %err, status = api.status_code, "request failed");
    } else {
        tracing::info!(error = %err, status = api.status_code, "request rejected");
    }
    api
}

/// Per-hop settings every inbound request derives its context from.
#[derive(Debug, Clone)]
pub struct HopContext {
    root: RequestContext,
    timeout: Duration,
}

impl HopContext {
    /// Request contexts are children of `shutdown`, so cancelling it aborts
    /// outbound calls still in flight.
    pub fn new(shutdown: CancellationToken, timeout: Duration) -> Self {
        Self { root: RequestContext::with_token(shutdown), timeout }
    }

    fn for_request(&self, span: &Span, headers: &HeaderMap) -> RequestContext {
        let trace = telemetry::continue_trace(span, headers);
        self.root.child().with_timeout(self.timeout).with_trace(trace)
    }
}

#[derive(Debug, Default, Deserialize)]
struct LocalityInput {
    #[serde(default)]
    cep: String,
}

#[derive(Debug, Clone)]
struct LocalityState {
    hop: HopContext,
    resolver: Arc<dyn LocalityResolver>,
}

/// Hop A: `POST /zipcode/` with `{"cep": "..."}`.
pub fn locality_router(resolver: Arc<dyn LocalityResolver>, hop: HopContext) -> Router {
    Router::new()
        .route("/zipcode/", post(resolve_locality))
        .route("/zipcode", post(resolve_locality))
        .with_state(LocalityState { hop, resolver })
}

async fn resolve_locality(
    State(state): State<LocalityState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Locality>, ApiError> {
    let span = tracing::info_span!("zipcode-handler", trace_id = tracing::field::Empty);
    let ctx = state.hop.for_request(&span, &headers);

    async move {
        // Absent `cep` or a `null` body fall through to postal code validation.
        let input = serde_json::from_slice::<Option<LocalityInput>>(&body)
            .map_err(|err| {
                tracing::info!(error = %err, "malformed request body");
                ApiError::new(StatusCode::BAD_REQUEST, "invalid request body")
            })?
            .unwrap_or_default();

        let postal_code = PostalCode::new(&input.cep).map_err(reject)?;

        let locality = state.resolver.resolve(&ctx, &postal_code).await.map_err(reject)?;
        if locality.is_not_found() {
            return Err(reject(Error::LocalityNotFound));
        }

        tracing::info!(%postal_code, locality = %locality.name, "locality resolved");
        Ok(Json(locality))
    }
    .instrument(span.clone())
    .await
}

#[derive(Debug, Clone)]
struct WeatherState {
    hop: HopContext,
    orchestrator: Orchestrator,
}

/// Hop B: `GET /zipcode/{cep}`.
pub fn weather_router(orchestrator: Orchestrator, hop: HopContext) -> Router {
    Router::new()
        .route("/zipcode/{cep}", get(lookup_weather))
        .with_state(WeatherState { hop, orchestrator })
}

async fn lookup_weather(
    State(state): State<WeatherState>,
    Path(cep): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LookupResult>, ApiError> {
    let span = tracing::info_span!("weather-handler", trace_id = tracing::field::Empty);
    let ctx = state.hop.for_request(&span, &headers);

    async move {
        let postal_code = PostalCode::new(&cep).map_err(reject)?;
        let result = state.orchestrator.lookup(&ctx, &postal_code).await.map_err(reject)?;

        tracing::info!(%postal_code, city = %result.city, "weather resolved");
        Ok(Json(result))
    }
    .instrument(span.clone())
    .await
}
