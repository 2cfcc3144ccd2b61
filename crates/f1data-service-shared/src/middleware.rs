//! Per-request observability for the f1data service.
//!
//! [`ObservabilityLayer`] wraps the router. For every request it:
//!
//! 1. resolves a [`RequestId`] from `X-Request-ID` (or mints a UUID v7),
//! 2. stores it in the request extensions for the [`RequestId`] extractor,
//! 3. runs the inner service inside a `request` span,
//! 4. echoes the ID back on the response and reports HTTP metrics through
//!    [`crate::metrics::record_http_request`].
//!
//! Metric labels use the route template from [`route_label`], never the raw
//! path, so a season of driver codes does not explode label cardinality.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use axum::extract::FromRequestParts;
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use http_body::Body;
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use tracing::Span;
use uuid::Uuid;

use crate::metrics::record_http_request;

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation ID carried through logs, problem responses and the
/// `X-Request-ID` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Time-ordered UUID v7.
    pub fn fresh() -> Self {
        RequestId(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return Ok(id.clone());
        }
        Ok(extract_or_generate_request_id(&parts.headers))
    }
}

/// Caller-supplied `X-Request-ID`, or a fresh ID when the header is missing,
/// empty or not valid UTF-8.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    match headers.get(&X_REQUEST_ID).map(HeaderValue::to_str) {
        Some(Ok(value)) if !value.is_empty() => RequestId(value.to_owned()),
        _ => RequestId::fresh(),
    }
}

/// Route template for a concrete request path. Query strings are ignored and
/// anything that is not one of the service's routes becomes `"other"`.
pub fn route_label(path: &str) -> &'static str {
    let path = path.split('?').next().unwrap_or(path);
    let mut segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());

    match (segments.next(), segments.count()) {
        (None, _) => "/",
        (Some("health"), 0) => "/health",
        (Some("metrics"), 0) => "/metrics",
        (Some("drivers"), 1) => "/drivers/{year}",
        (Some("telemetry"), 3) => "/telemetry/{year}/{round}/{driver}",
        (Some("lap-times"), 2) => "/lap-times/{year}/{round}",
        (Some("session"), 3) => "/session/{year}/{round}/{session_type}",
        (Some("championship-standings"), 1) => "/championship-standings/{year}",
        (Some("driver-performance"), 1) => "/driver-performance/{year}",
        (Some("race-calendar"), 1) => "/race-calendar/{year}",
        (Some("team-analysis"), 1) => "/team-analysis/{year}",
        _ => "other",
    }
}

/// Tower layer installing [`Observed`] around the router.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilityLayer;

impl<S> Layer<S> for ObservabilityLayer {
    type Service = Observed<S>;

    fn layer(&self, service: S) -> Observed<S> {
        Observed { service }
    }
}

#[derive(Debug, Clone)]
pub struct Observed<S> {
    service: S,
}

impl<S, B, R> Service<Request<B>> for Observed<S>
where
    S: Service<Request<B>, Response = Response<R>>,
    R: Body,
{
    type Response = Response<R>;
    type Error = S::Error;
    type Future = ObservedResponse<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let started = Instant::now();
        let request_id = extract_or_generate_request_id(req.headers());
        let route = route_label(req.uri().path());
        let method = req.method().as_str().to_owned();

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %req.uri().path(),
        );
        span.in_scope(|| {
            tracing::info!(query = req.uri().query().unwrap_or(""), "handling request")
        });

        req.extensions_mut().insert(request_id.clone());
        let inner = span.in_scope(|| self.service.call(req));

        ObservedResponse {
            inner,
            started,
            method,
            route,
            request_id,
            span,
        }
    }
}

pin_project! {
    /// Response future for [`Observed`].
    pub struct ObservedResponse<F> {
        #[pin]
        inner: F,
        started: Instant,
        method: String,
        route: &'static str,
        request_id: RequestId,
        span: Span,
    }
}

impl<F, R, E> Future for ObservedResponse<F>
where
    F: Future<Output = Result<Response<R>, E>>,
    R: Body,
{
    type Output = Result<Response<R>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.span.enter();
        let mut outcome = ready!(this.inner.poll(cx));

        let elapsed = this.started.elapsed();
        let latency_ms = elapsed.as_secs_f64() * 1000.0;

        match outcome.as_mut() {
            Ok(response) => {
                let status = response.status().as_u16();
                let size = response.body().size_hint().exact();
                record_http_request(this.method, *this.route, Some(status), elapsed, size);

                if let Ok(value) = HeaderValue::from_str(this.request_id.as_str()) {
                    response.headers_mut().insert(X_REQUEST_ID.clone(), value);
                }
                tracing::info!(status, latency_ms, "request completed");
            }
            Err(_) => {
                record_http_request(this.method, *this.route, None, elapsed, None);
                tracing::error!(latency_ms, "request failed");
            }
        }

        Poll::Ready(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_distinct_uuids() {
        let first = RequestId::fresh();
        let second = RequestId::fresh();
        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn caller_supplied_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-ID", HeaderValue::from_static("bahrain-fp1-7"));
        assert_eq!(extract_or_generate_request_id(&headers).to_string(), "bahrain-fp1-7");
    }

    #[test]
    fn blank_or_missing_header_mints_an_id() {
        let mut headers = HeaderMap::new();
        assert!(Uuid::parse_str(extract_or_generate_request_id(&headers).as_str()).is_ok());

        headers.insert(X_REQUEST_ID.clone(), HeaderValue::from_static(""));
        assert!(Uuid::parse_str(extract_or_generate_request_id(&headers).as_str()).is_ok());
    }

    #[test]
    fn route_label_uses_templates() {
        let cases = [
            ("/", "/"),
            ("/health", "/health"),
            ("/drivers/2023", "/drivers/{year}"),
            ("/telemetry/2023/1/VER?lap_number=12", "/telemetry/{year}/{round}/{driver}"),
            ("/lap-times/2023/5", "/lap-times/{year}/{round}"),
            ("/session/2023/1/R", "/session/{year}/{round}/{session_type}"),
            ("/team-analysis/2023/", "/team-analysis/{year}"),
            ("/drivers", "other"),
            ("/nope/1/2/3/4", "other"),
        ];
        for (path, expected) in cases {
            assert_eq!(route_label(path), expected, "{path}");
        }
    }
}
