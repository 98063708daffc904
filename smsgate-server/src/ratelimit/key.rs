//! Caller identity derivation.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;

use crate::payload::SmsPayload;

/// Derives a rate-limit identity from a request, or fails with a
/// precondition problem the caller must surface. Strategies compose by
/// concatenation; any failure fails the whole derivation.
pub type KeyFn = Arc<dyn Fn(&Request) -> Result<String, KeyError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("unable to determine client address")]
    NoClientAddress,
    #[error("request payload has not been decoded")]
    MissingPayload,
}

/// Identity from the network origin.
///
/// Trusted proxy headers take precedence over the socket address, in fixed
/// order: `True-Client-IP`, `X-Real-IP`, then the first entry of
/// `X-Forwarded-For`. Without any of them the connection's remote address is
/// used, port stripped.
pub fn key_by_ip() -> KeyFn {
    Arc::new(|req: &Request| client_ip(req).map(|ip| canonical_ip(&ip)))
}

/// Identity from the message sender, read from the payload decoded by an
/// upstream stage.
pub fn key_by_sender() -> KeyFn {
    Arc::new(|req: &Request| {
        req.extensions()
            .get::<SmsPayload>()
            .map(|payload| payload.from.clone())
            .ok_or(KeyError::MissingPayload)
    })
}

/// Static identity: the literal request path. Provided for per-endpoint
/// buckets; not composed with the other strategies by default.
pub fn key_by_path() -> KeyFn {
    Arc::new(|req: &Request| Ok(req.uri().path().to_string()))
}

fn client_ip(req: &Request) -> Result<String, KeyError> {
    let headers = req.headers();
    if let Some(ip) = header_value(headers, "true-client-ip") {
        return Ok(ip.to_string());
    }
    if let Some(ip) = header_value(headers, "x-real-ip") {
        return Ok(ip.to_string());
    }
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        let first = forwarded.split(',').next().unwrap_or(forwarded);
        return Ok(first.trim().to_string());
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .ok_or(KeyError::NoClientAddress)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Maps IPv6 addresses onto their /64 prefix so clients on one subnet share
/// a bucket; IPv4 addresses and unparsable values pass through verbatim.
pub fn canonical_ip(ip: &str) -> String {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => Ipv6Addr::from(u128::from(v6) & (u128::MAX << 64)).to_string(),
        _ => ip.to_string(),
    }
}
