//! Basic authentication against the account directory.
//!
//! The authenticated account travels with the request as a
//! [`CurrentAccount`] extension, so downstream stages read exactly the
//! identity that authenticated this request.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::account::Account;
use crate::error::ApiError;
use crate::routes::AppState;

/// The account that authenticated the current request.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

pub async fn basic_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(authorization) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
    else {
        let mut response = ApiError::Unauthorized.into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=Restricted"),
        );
        return Ok(response);
    };

    let (username, password) =
        decode_credentials(&authorization).ok_or(ApiError::Unauthorized)?;

    let account = state
        .accounts
        .find_by_username(&username)
        .await
        .ok_or(ApiError::Unauthorized)?;

    if account.auth_id != password {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(CurrentAccount(account));
    Ok(next.run(req).await)
}

fn decode_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_well_formed_credentials() {
        // "acme:secret"
        let (username, password) = decode_credentials("Basic YWNtZTpzZWNyZXQ=").unwrap();
        assert_eq!(username, "acme");
        assert_eq!(password, "secret");
    }

    #[test]
    fn rejects_malformed_credentials() {
        assert!(decode_credentials("Bearer token").is_none());
        assert!(decode_credentials("Basic !!!not-base64!!!").is_none());
        // "no-separator"
        assert!(decode_credentials("Basic bm8tc2VwYXJhdG9y").is_none());
    }
}
