//! API error taxonomy and response envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON envelope shared by success and error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ApiResponse {
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Payload failed validation or could not be decoded.
    #[error("{0}")]
    Validation(String),

    /// Missing or wrong credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// A number the request refers to is not provisioned for the account.
    #[error("{0} parameter not found")]
    UnknownNumber(&'static str),

    /// The sender/recipient pair opted out via STOP.
    #[error("sms from {from} to {to} blocked by STOP request")]
    Stopped { from: String, to: String },

    /// A precondition for evaluating the request was not met, e.g. the
    /// rate-limit identity could not be derived.
    #[error("{0}")]
    Precondition(String),

    /// Unexpected failure, e.g. a rate limit backend error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::UnknownNumber(_) | ApiError::Stopped { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::Precondition(_) => StatusCode::PRECONDITION_REQUIRED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ApiResponse::error(self.to_string()))).into_response()
    }
}
