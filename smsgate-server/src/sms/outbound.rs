//! Outbound SMS: messages sent from a provisioned number.

use std::time::SystemTime;

use axum::Json;
use axum::extract::{Extension, State};

use crate::account::Account;
use crate::auth::CurrentAccount;
use crate::error::{ApiError, ApiResponse};
use crate::payload::SmsPayload;
use crate::routes::AppState;

/// `POST /api/outbound/sms`
pub async fn post_sms(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Extension(payload): Extension<SmsPayload>,
) -> Result<Json<ApiResponse>, ApiError> {
    send(&state, &account, &payload, SystemTime::now()).await?;
    Ok(Json(ApiResponse::message("outbound sms ok")))
}

/// Rejects STOP-blocked pairs, then validates the source number.
pub(crate) async fn send(
    state: &AppState,
    account: &Account,
    payload: &SmsPayload,
    now: SystemTime,
) -> Result<(), ApiError> {
    if state.stoplist.is_blocked(&payload.from, &payload.to, now) {
        tracing::info!(from = %payload.from, to = %payload.to, "sms blocked by STOP request");
        return Err(ApiError::Stopped {
            from: payload.from.clone(),
            to: payload.to.clone(),
        });
    }

    if !state.accounts.owns_number(account.id, &payload.from).await {
        return Err(ApiError::UnknownNumber("from"));
    }

    Ok(())
}
