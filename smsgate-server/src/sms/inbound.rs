//! Inbound SMS: messages arriving for a provisioned number.

use std::time::SystemTime;

use axum::Json;
use axum::extract::{Extension, State};

use crate::account::Account;
use crate::auth::CurrentAccount;
use crate::error::{ApiError, ApiResponse};
use crate::payload::SmsPayload;
use crate::routes::AppState;

/// `POST /api/inbound/sms`
pub async fn post_sms(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Extension(payload): Extension<SmsPayload>,
) -> Result<Json<ApiResponse>, ApiError> {
    receive(&state, &account, &payload, SystemTime::now()).await?;
    Ok(Json(ApiResponse::message("inbound sms ok")))
}

/// Validates the destination and honors STOP requests.
pub(crate) async fn receive(
    state: &AppState,
    account: &Account,
    payload: &SmsPayload,
    now: SystemTime,
) -> Result<(), ApiError> {
    if !state.accounts.owns_number(account.id, &payload.to).await {
        return Err(ApiError::UnknownNumber("to"));
    }

    if payload.text == "stop" {
        tracing::info!(from = %payload.from, to = %payload.to, "STOP command received");
        state.stoplist.block(&payload.from, &payload.to, now);
    }

    Ok(())
}
