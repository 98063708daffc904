//! Tower middleware applying the rate limiter to a service.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use smsgate::{LimitCounter, LimitError, MemoryCounter, RateDecision, RateLimiter};
use tower::{Layer, Service};

use super::key::{KeyError, KeyFn};
use crate::error::ApiError;
use crate::metrics::Metrics;

/// Response hook invoked when a request exceeds the limit.
pub type LimitHandler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Configures and builds a [`RateLimitLayer`].
pub struct RateLimitBuilder {
    limit: u64,
    window: Duration,
    key_fns: Vec<KeyFn>,
    counter: Option<Arc<dyn LimitCounter>>,
    on_limit: Option<LimitHandler>,
    metrics: Option<Arc<Metrics>>,
}

impl RateLimitBuilder {
    /// Adds a key extraction strategy; strategies compose in insertion
    /// order. Without any, every caller shares one global bucket.
    pub fn key_fn(mut self, key_fn: KeyFn) -> Self {
        self.key_fns.push(key_fn);
        self
    }

    /// Substitutes the counter backend. Defaults to a process-local
    /// [`MemoryCounter`].
    pub fn counter(mut self, counter: Arc<dyn LimitCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Replaces the rejection response. Defaults to a plain
    /// `429 Too Many Requests`.
    pub fn on_limit(mut self, handler: LimitHandler) -> Self {
        self.on_limit = Some(handler);
        self
    }

    /// Records admission decisions on the given metrics.
    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<RateLimitLayer, LimitError> {
        let counter = self
            .counter
            .unwrap_or_else(|| Arc::new(MemoryCounter::new(self.window)));
        let limiter = RateLimiter::with_counter(self.limit, self.window, counter)?;

        let mut key_fns = self.key_fns;
        if key_fns.is_empty() {
            key_fns.push(Arc::new(|_: &Request| Ok("*".to_string())));
        }

        let on_limit = self.on_limit.unwrap_or_else(|| {
            Arc::new(|_: &Request| {
                (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
            })
        });

        Ok(RateLimitLayer {
            limiter: Arc::new(limiter),
            key_fns: key_fns.into(),
            on_limit,
            metrics: self.metrics,
        })
    }
}

/// Admission control middleware layer.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    key_fns: Arc<[KeyFn]>,
    on_limit: LimitHandler,
    metrics: Option<Arc<Metrics>>,
}

impl RateLimitLayer {
    /// Starts configuring a limiter for `limit` requests per `window`.
    pub fn builder(limit: u64, window: Duration) -> RateLimitBuilder {
        RateLimitBuilder {
            limit,
            window,
            key_fns: Vec::new(),
            counter: None,
            on_limit: None,
            metrics: None,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            key_fns: self.key_fns.clone(),
            on_limit: self.on_limit.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Admission control middleware service.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    key_fns: Arc<[KeyFn]>,
    on_limit: LimitHandler,
    metrics: Option<Arc<Metrics>>,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let limiter = self.limiter.clone();
        let key_fns = self.key_fns.clone();
        let on_limit = self.on_limit.clone();
        let metrics = self.metrics.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let key = match derive_key(&key_fns, &req) {
                Ok(key) => key,
                Err(err) => {
                    if let Some(metrics) = &metrics {
                        metrics.record_error();
                    }
                    return Ok(ApiError::Precondition(err.to_string()).into_response());
                }
            };

            let decision = match limiter.check(&key, SystemTime::now()) {
                Ok(decision) => decision,
                Err(err) => {
                    tracing::error!(%err, "rate limit backend failure");
                    if let Some(metrics) = &metrics {
                        metrics.record_error();
                    }
                    return Ok(ApiError::Internal(err.to_string()).into_response());
                }
            };

            if !decision.allowed {
                tracing::debug!(key = %key, "request over limit");
                if let Some(metrics) = &metrics {
                    metrics.record_denied();
                }
                let mut response = (on_limit)(&req);
                apply_rate_headers(&mut response, &decision);
                return Ok(response);
            }

            if let Some(metrics) = &metrics {
                metrics.record_allowed();
            }
            let mut response = inner.call(req).await?;
            apply_rate_headers(&mut response, &decision);
            Ok(response)
        })
    }
}

/// Runs the extraction strategies in order and concatenates their output.
/// The first failure fails the whole derivation.
pub(crate) fn derive_key(key_fns: &[KeyFn], req: &Request) -> Result<String, KeyError> {
    let mut key = String::new();
    for key_fn in key_fns {
        key.push_str(&key_fn(req)?);
    }
    Ok(key)
}

fn apply_rate_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );

    let reset = decision
        .reset
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_secs())
        .unwrap_or(0);
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(reset),
    );

    if let Some(retry_after) = decision.retry_after {
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(retry_after.as_secs()),
        );
    }
}
