use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::observability::{self, InFlight};

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation id of the current request, available as a request extension.
#[derive(Clone, Debug)]
pub struct CorrelationId(pub String);

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER))
}

pub fn timeout_layer(request_timeout_ms: u64) -> TimeoutLayer {
    TimeoutLayer::new(Duration::from_millis(request_timeout_ms.max(1)))
}

pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, ForumSpan> {
    TraceLayer::new_for_http().make_span_with(ForumSpan)
}

#[derive(Clone, Copy, Default)]
pub struct ForumSpan;

impl<B> MakeSpan<B> for ForumSpan {
    fn make_span(&mut self, req: &Request<B>) -> Span {
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or_else(|| req.uri().path());
        let correlation_id = req
            .extensions()
            .get::<CorrelationId>()
            .map(|id| id.0.as_str())
            .unwrap_or("-");
        info_span!(
            "forum_request",
            method = %req.method(),
            route,
            request_id = header_str(req.headers(), REQUEST_ID_HEADER).unwrap_or("-"),
            correlation_id
        )
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn acceptable_correlation_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_CORRELATION_ID_LEN
        && value.bytes().all(|byte| byte.is_ascii_graphic())
}

/// Takes the caller's correlation id, else the request id, else a fresh uuid,
/// and echoes it on the response.
pub async fn correlation_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let correlation_id = match req.headers().get(CORRELATION_ID_HEADER) {
        Some(value) => match value.to_str() {
            Ok(value) if acceptable_correlation_id(value) => value.to_string(),
            _ => {
                return ApiError::Validation("invalid x-correlation-id header".into())
                    .into_response();
            }
        },
        None => header_str(req.headers(), REQUEST_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::now_v7().to_string()),
    };

    req.extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
    }
    response
}

pub async fn metrics_layer(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let started = Instant::now();
    let in_flight = InFlight::enter(&route);
    let response = next.run(req).await;
    drop(in_flight);

    observability::register_http_request(
        method.as_str(),
        &route,
        response.status(),
        started.elapsed(),
    );
    response
}
