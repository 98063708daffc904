//! Router assembly and shared application state.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::account::AccountDirectory;
use crate::auth::basic_auth;
use crate::config::Config;
use crate::error::ApiResponse;
use crate::metrics::Metrics;
use crate::payload::{SmsPayload, decode_payload};
use crate::ratelimit::{RateLimitLayer, key_by_ip, key_by_sender};
use crate::sms::stoplist::StopList;
use crate::sms::{inbound, outbound};

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountDirectory>,
    pub stoplist: Arc<StopList>,
    pub metrics: Arc<Metrics>,
}

/// Builds the application router: public liveness endpoints plus the
/// authenticated, admission-controlled `/api` surface.
///
/// Middleware order on `/api`, outermost first: basic auth, payload decode,
/// rate limit. The limiter composes the caller's network origin with the
/// message sender, so it must run after the payload has been decoded.
pub fn router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let limit_layer = RateLimitLayer::builder(config.request_limit, config.window)
        .key_fn(key_by_ip())
        .key_fn(key_by_sender())
        .on_limit(Arc::new(limit_exceeded))
        .metrics(state.metrics.clone())
        .build()?;

    let api = Router::new()
        .route("/inbound/sms", post(inbound::post_sms))
        .route("/outbound/sms", post(outbound::post_sms))
        .layer(limit_layer)
        .layer(middleware::from_fn(decode_payload))
        .layer(middleware::from_fn_with_state(state.clone(), basic_auth));

    Ok(Router::new()
        .route("/ping", get(ping))
        .route("/metrics", get(export_metrics))
        .nest("/api", api)
        .with_state(state))
}

/// Rejection response naming the throttled sender, in the API's envelope.
fn limit_exceeded(req: &Request) -> Response {
    let sender = req
        .extensions()
        .get::<SmsPayload>()
        .map(|payload| payload.from.clone())
        .unwrap_or_default();
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ApiResponse::error(format!("limit reached for from {sender}"))),
    )
        .into_response()
}

async fn ping() -> &'static str {
    "Welcome to smsgate"
}

async fn export_metrics(State(state): State<AppState>) -> String {
    state.metrics.export_prometheus()
}
