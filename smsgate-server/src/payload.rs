//! SMS payload decoding.
//!
//! One upstream stage parses and validates the JSON body and attaches the
//! result to the request as an [`SmsPayload`] extension. Later stages (the
//! handlers, the limiter's by-sender key strategy) only read the extension;
//! none of them touch the body themselves.

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// A decoded SMS message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsPayload {
    pub from: String,
    pub to: String,
    pub text: String,
}

impl SmsPayload {
    /// Checks field presence and length bounds, then normalizes the text to
    /// trimmed lowercase.
    pub fn validate(mut self) -> Result<Self, ApiError> {
        let mut problems = Vec::new();
        for (name, value, min, max) in [
            ("from", &self.from, 6, 16),
            ("to", &self.to, 6, 16),
            ("text", &self.text, 1, 160),
        ] {
            let length = value.chars().count();
            if length == 0 {
                problems.push(format!("{name} is missing"));
            } else if length < min || length > max {
                problems.push(format!("{name} is invalid"));
            }
        }
        if !problems.is_empty() {
            return Err(ApiError::Validation(problems.join(", ")));
        }

        self.text = self.text.trim().to_lowercase();
        Ok(self)
    }
}

/// Decodes and validates the SMS body, then forwards the request with the
/// payload attached as an extension. The body is restored for downstream
/// consumers.
pub async fn decode_payload(req: Request, next: Next) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::Validation("unable to read request body".into()))?;

    let payload: SmsPayload = serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::Validation(format!("malformed payload: {err}")))?;
    let payload = payload.validate()?;

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(payload);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(from: &str, to: &str, text: &str) -> SmsPayload {
        SmsPayload {
            from: from.into(),
            to: to.into(),
            text: text.into(),
        }
    }

    #[test]
    fn accepts_and_normalizes_a_valid_payload() {
        let validated = payload("14155550100", "14155550123", "  STOP ")
            .validate()
            .unwrap();
        assert_eq!(validated.text, "stop");
    }

    #[test]
    fn rejects_missing_fields() {
        let err = payload("", "14155550123", "hi").validate().unwrap_err();
        assert!(err.to_string().contains("from is missing"));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let err = payload("123", "14155550123", "hi").validate().unwrap_err();
        assert!(err.to_string().contains("from is invalid"));

        let long_text = "x".repeat(161);
        let err = payload("14155550100", "14155550123", &long_text)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("text is invalid"));
    }

    #[test]
    fn collects_every_problem() {
        let err = payload("", "12", "").validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("from is missing"));
        assert!(message.contains("to is invalid"));
        assert!(message.contains("text is missing"));
    }
}
